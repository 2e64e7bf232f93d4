use proc_macro::TokenStream;

mod declare;

/// Derive macro declaring a type to the orchestrator
///
/// Generates `keystone::Declared`. With `singleton`, also generates
/// `keystone::Singleton` constructing the type through `Default`; the type
/// must still implement `keystone::Lifecycle`.
///
/// Attributes (all optional, may be split across several `#[declare]`):
/// - `name = "..."`: type name, defaults to the struct name
/// - `depends_on = [A, B]`: hard dependencies, as paths or string literals.
///   A path is never resolved; it contributes its last identifier only, so
///   `ui::Window` means `"Window"`. A dependency on a type declared with a
///   custom `name` must spell that name as a literal:
///   `depends_on = ["main-window"]`
/// - `optional = [C]`: optional dependencies
/// - `gui`: only constructed when a graphical environment is present
/// - `singleton`: no-argument construction via `Default`
///
/// # Example
/// ```ignore
/// use keystone::Declare;
///
/// #[derive(Declare, Default)]
/// #[declare(depends_on = [Logger], optional = [Metrics], singleton)]
/// pub struct Service {
///     requests: AtomicU64,
/// }
/// ```
#[proc_macro_derive(Declare, attributes(declare))]
pub fn derive_declare(input: TokenStream) -> TokenStream {
    declare::derive_declare(input)
}
