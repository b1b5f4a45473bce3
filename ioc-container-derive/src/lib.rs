//! Derive macro for ioc-container
//!
//! `#[derive(Constructible)]` describes a struct's fields as the parameters
//! of a single constructor named `from_fields`, so the container can build
//! the struct without a hand-written `Constructible` impl.
//!
//! # Example
//!
//! ```rust,ignore
//! use ioc_container::{Constructible, Container};
//! use std::sync::Arc;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! trait Plugin: Send + Sync {}
//!
//! #[derive(Default)]
//! struct Settings {
//!     verbose: bool,
//! }
//!
//! #[derive(Constructible)]
//! #[inject(key = "users")]
//! struct UserService {
//!     #[inject]
//!     db: Arc<Database>,
//!     #[inject(key = "replica")]
//!     replica: Arc<Database>,
//!     #[inject(default)]
//!     settings: Arc<Settings>,
//!     #[inject(all)]
//!     plugins: Vec<Arc<dyn Plugin>>,
//!     // Non-injected fields use Default
//!     request_count: u64,
//! }
//! ```

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, Type, parse_macro_input};

/// Derive `ioc_container::Constructible`.
///
/// # Attributes
///
/// On fields:
/// - `#[inject]` - resolve an `Arc<T>` field from the container
/// - `#[inject(key = "k")]` - resolve the binding registered under `k`
/// - `#[inject(default)]` - fall back to `Arc::new(T::default())` when `T`
///   is not registered
/// - `#[inject(all)]` - collect every binding of `T` into a `Vec<Arc<T>>`
///
/// Fields without `#[inject]` use `Default::default()`.
///
/// On the struct:
/// - `#[inject(key = "k")]` - type-level key used when the struct is bound
///   without an explicit key
#[proc_macro_derive(Constructible, attributes(inject))]
pub fn derive_constructible(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    // Only support structs with named fields, or unit structs
    let (fields, is_unit) = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => (fields.named.iter().collect::<Vec<_>>(), false),
            Fields::Unit => (Vec::new(), true),
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Constructible can only be derived for structs with named fields or unit structs",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Constructible can only be derived for structs",
            ));
        }
    };

    let mut field_inits = Vec::with_capacity(fields.len());
    let mut parameters = Vec::new();

    for field in &fields {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let param_name = field_name.to_string();

        let Some(options) = parse_field_attr(&field.attrs)? else {
            field_inits.push(quote! {
                #field_name: ::std::default::Default::default()
            });
            continue;
        };

        if options.all {
            if options.default {
                return Err(syn::Error::new_spanned(
                    *field,
                    "#[inject(all)] cannot be combined with `default`",
                ));
            }
            let inner = extract_vec_arc_inner_type(&field.ty).ok_or_else(|| {
                syn::Error::new_spanned(
                    &field.ty,
                    "Fields marked with #[inject(all)] must have type Vec<Arc<T>>",
                )
            })?;
            field_inits.push(quote! {
                #field_name: args.next_all::<#inner>()?
            });
            parameters.push(with_key(
                quote! { ::ioc_container::Parameter::collection::<#inner>(#param_name) },
                options.key.as_ref(),
            ));
            continue;
        }

        let inner = extract_arc_inner_type(&field.ty).ok_or_else(|| {
            syn::Error::new_spanned(&field.ty, "Fields marked with #[inject] must have type Arc<T>")
        })?;
        field_inits.push(quote! {
            #field_name: args.next::<#inner>()?
        });
        let parameter = if options.default {
            quote! { ::ioc_container::Parameter::single_or_default::<#inner>(#param_name) }
        } else {
            quote! { ::ioc_container::Parameter::single::<#inner>(#param_name) }
        };
        parameters.push(with_key(parameter, options.key.as_ref()));
    }

    let key_fn = parse_struct_key(&input.attrs)?.map(|key| {
        quote! {
            fn key() -> ::std::option::Option<&'static str> {
                ::std::option::Option::Some(#key)
            }
        }
    });

    let body = if is_unit {
        quote! { Self }
    } else {
        quote! { Self { #(#field_inits),* } }
    };

    Ok(quote! {
        impl #impl_generics ::ioc_container::Constructible for #name #ty_generics #where_clause {
            fn constructors() -> ::std::vec::Vec<::ioc_container::Constructor<Self>> {
                ::std::vec![
                    ::ioc_container::Constructor::new(
                        "from_fields",
                        |args: &mut ::ioc_container::Arguments| {
                            ::std::result::Result::Ok(#body)
                        },
                    )
                    #(.with_parameter(#parameters))*
                ]
            }

            #key_fn
        }
    })
}

fn with_key(parameter: TokenStream2, key: Option<&LitStr>) -> TokenStream2 {
    match key {
        Some(key) => quote! { #parameter.with_key(#key) },
        None => parameter,
    }
}

/// Options parsed from a field's `#[inject(...)]`
#[derive(Default)]
struct InjectOptions {
    key: Option<LitStr>,
    default: bool,
    all: bool,
}

/// Find and parse the #[inject] attribute on a field
fn parse_field_attr(attrs: &[Attribute]) -> syn::Result<Option<InjectOptions>> {
    let Some(attr) = attrs.iter().find(|a| a.path().is_ident("inject")) else {
        return Ok(None);
    };

    let mut options = InjectOptions::default();
    if attr.meta.require_path_only().is_ok() {
        return Ok(Some(options));
    }

    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("key") {
            options.key = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("default") {
            options.default = true;
            Ok(())
        } else if meta.path.is_ident("all") {
            options.all = true;
            Ok(())
        } else {
            Err(meta.error("expected `key = \"...\"`, `default` or `all`"))
        }
    })?;

    Ok(Some(options))
}

/// Parse a struct-level #[inject(key = "...")]
fn parse_struct_key(attrs: &[Attribute]) -> syn::Result<Option<LitStr>> {
    let mut key = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("inject")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("key") {
                key = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("only `key = \"...\"` is supported on the struct"))
            }
        })?;
    }
    Ok(key)
}

/// Extract T from Arc<T>
fn extract_arc_inner_type(ty: &Type) -> Option<&Type> {
    single_generic_argument(ty, "Arc")
}

/// Extract T from Vec<Arc<T>>
fn extract_vec_arc_inner_type(ty: &Type) -> Option<&Type> {
    single_generic_argument(ty, "Vec").and_then(extract_arc_inner_type)
}

fn single_generic_argument<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first() {
        Some(syn::GenericArgument::Type(inner)) => Some(inner),
        _ => None,
    }
}
