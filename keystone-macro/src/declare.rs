use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    bracketed, parse::Parse, parse::ParseStream, parse_macro_input, DeriveInput, Ident, LitStr,
    Path, Token,
};

/// A dependency named either by a type path (`Logger`, `crate::ui::Window`)
/// or by a string literal. Paths are never resolved: only the last segment
/// is used, so the named type does not have to exist.
enum DependencyName {
    Path(Path),
    Literal(LitStr),
}

impl DependencyName {
    fn name(&self) -> syn::Result<String> {
        match self {
            DependencyName::Path(path) => path
                .segments
                .last()
                .map(|segment| segment.ident.to_string())
                .ok_or_else(|| syn::Error::new_spanned(path, "empty dependency path")),
            DependencyName::Literal(lit) => {
                let value = lit.value();
                if value.trim().is_empty() {
                    return Err(syn::Error::new_spanned(lit, "dependency name must not be empty"));
                }
                Ok(value)
            }
        }
    }
}

impl Parse for DependencyName {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        if input.peek(LitStr) {
            Ok(DependencyName::Literal(input.parse()?))
        } else {
            Ok(DependencyName::Path(input.parse()?))
        }
    }
}

#[derive(Default)]
struct DeclareArgs {
    name: Option<LitStr>,
    depends_on: Vec<DependencyName>,
    optional: Vec<DependencyName>,
    gui: bool,
    singleton: bool,
}

impl DeclareArgs {
    fn parse_into(&mut self, input: ParseStream) -> syn::Result<()> {
        while !input.is_empty() {
            let key: Ident = input.parse()?;

            if key == "name" {
                input.parse::<Token![=]>()?;
                self.name = Some(input.parse()?);
            } else if key == "depends_on" || key == "optional" {
                input.parse::<Token![=]>()?;
                // Parse array: [Item1, Item2, ...]
                let content;
                bracketed!(content in input);
                let items = content.parse_terminated(DependencyName::parse, Token![,])?;
                if key == "depends_on" {
                    self.depends_on.extend(items);
                } else {
                    self.optional.extend(items);
                }
            } else if key == "gui" {
                self.gui = true;
            } else if key == "singleton" {
                self.singleton = true;
            } else {
                return Err(syn::Error::new_spanned(
                    &key,
                    "expected one of: name, depends_on, optional, gui, singleton",
                ));
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }
        Ok(())
    }
}

pub fn derive_declare(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match generate_declared_impl(&input) {
        Ok(expanded) => TokenStream::from(expanded),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn generate_declared_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "#[derive(Declare)] needs a concrete type: a type name must identify exactly one type",
        ));
    }

    let mut args = DeclareArgs::default();
    for attr in input.attrs.iter().filter(|a| a.path().is_ident("declare")) {
        attr.parse_args_with(|input: ParseStream| args.parse_into(input))?;
    }

    let type_ident = &input.ident;
    let type_name = match &args.name {
        Some(lit) => lit.value(),
        None => type_ident.to_string(),
    };
    let dependencies = names(&args.depends_on)?;
    let optional = names(&args.optional)?;
    let gui = args.gui;

    let singleton_impl = if args.singleton {
        quote! {
            impl ::keystone::Singleton for #type_ident {
                fn construct() -> ::core::result::Result<Self, ::keystone::LifecycleError> {
                    ::core::result::Result::Ok(<Self as ::core::default::Default>::default())
                }
            }
        }
    } else {
        quote!()
    };

    Ok(quote! {
        impl ::keystone::Declared for #type_ident {
            const TYPE_NAME: &'static str = #type_name;
            const DEPENDENCIES: &'static [&'static str] = &[#(#dependencies),*];
            const OPTIONAL_DEPENDENCIES: &'static [&'static str] = &[#(#optional),*];
            const REQUIRES_GUI: bool = #gui;
        }

        #singleton_impl
    })
}

fn names(items: &[DependencyName]) -> syn::Result<Vec<String>> {
    items.iter().map(DependencyName::name).collect()
}
