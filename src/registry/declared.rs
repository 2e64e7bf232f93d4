/// Declarative metadata the resolver reads off a registered type
///
/// Usually generated by `#[derive(Declare)]`:
///
/// ```rust,ignore
/// #[derive(Declare, Default)]
/// #[declare(depends_on = [Logger], optional = [Metrics], singleton)]
/// pub struct Service;
/// ```
///
/// Dependencies are named by type name, not by type, so an optional
/// dependency does not need to exist in the build at all.
pub trait Declared {
    /// Unique identity of the type in the orchestrator
    const TYPE_NAME: &'static str;

    /// Types that must be constructed and post-initialized first
    const DEPENDENCIES: &'static [&'static str] = &[];

    /// Types ordered first when they are registered, ignored otherwise
    const OPTIONAL_DEPENDENCIES: &'static [&'static str] = &[];

    /// Dropped from the run entirely when there is no graphical environment
    const REQUIRES_GUI: bool = false;
}
