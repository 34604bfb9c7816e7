//! Procedural macros for the searchlayer project.
//!
//! `#[derive(Model)]` generates the field table of a struct with named fields: one accessor pair
//! per field, the wire name each field is stored under, and which field is the identifier.
//!
//! # Attributes
//!
//! Container:
//!
//! - `#[model(index = "users")]` - the index the model lives in. Defaults to the snake-cased
//!   type name.
//! - `#[model(crate = "path")]` - where the searchlayer API is found. Defaults to `::searchlayer`.
//!
//! Field:
//!
//! - `#[model(id)]` - marks the identifier field.
//! - `#[model(rename = "wire")]` - the document key. `#[serde(rename = "wire")]` is honoured too,
//!   with `#[model(rename)]` taking precedence.
//! - `#[model(kind = "integer")]` - overrides the kind inferred from the field type.
//! - `#[model(skip)]` - leaves the field out of the table.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{Data, DeriveInput, Error, Field, Fields, LitStr, Path, Result, meta::ParseNestedMeta};

#[proc_macro_derive(Model, attributes(model, serde))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    match syn::parse(input).and_then(expand_model) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

struct ContainerAttrs {
    index: Option<String>,
    krate: Path,
}

#[derive(Default)]
struct FieldAttrs {
    id: bool,
    skip: bool,
    rename: Option<String>,
    serde_rename: Option<String>,
    kind: Option<(String, Span)>,
}

const KINDS: &[(&str, &str)] = &[
    ("text", "Text"),
    ("integer", "Integer"),
    ("float", "Float"),
    ("boolean", "Boolean"),
    ("date", "Date"),
    ("sequence", "Sequence"),
    ("nested", "Nested"),
    ("unknown", "Unknown"),
];

fn expand_model(input: DeriveInput) -> Result<TokenStream2> {
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    let container = container_attrs(&input)?;
    let krate = &container.krate;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            other => {
                return Err(Error::new_spanned(
                    other,
                    "Model can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(Error::new_spanned(
                ident,
                "Model can only be derived for structs with named fields",
            ));
        }
    };

    let mut declarations = Vec::with_capacity(fields.len());
    let mut identifier: Option<&Field> = None;

    for field in fields {
        let attrs = field_attrs(field)?;
        if attrs.skip {
            continue;
        }
        if attrs.id {
            if identifier.is_some() {
                return Err(Error::new_spanned(field, "only one field can be marked #[model(id)]"));
            }
            identifier = Some(field);
        }
        declarations.push(field_declaration(field, &attrs, krate)?);
    }

    let type_name = ident.to_string();
    let index = container
        .index
        .unwrap_or_else(|| snake_case(&type_name));

    Ok(quote! {
        impl #impl_generics #krate::model::Model for #ident #ty_generics #where_clause {
            fn index_name() -> &'static str {
                #index
            }

            fn declare() -> #krate::model::ModelDescriptor<Self> {
                #krate::model::ModelDescriptor::new(#type_name)
                    #(.field(#declarations))*
            }
        }
    })
}

fn field_declaration(field: &Field, attrs: &FieldAttrs, krate: &Path) -> Result<TokenStream2> {
    let Some(member) = field.ident.as_ref() else {
        return Err(Error::new_spanned(field, "expected a named field"));
    };
    let ty = &field.ty;
    let name = member.to_string();

    let kind = match &attrs.kind {
        Some((kind, span)) => {
            let Some((_, variant)) = KINDS.iter().find(|(key, _)| key == kind) else {
                return Err(Error::new(*span, format!("unknown field kind `{kind}`")));
            };
            let variant = syn::Ident::new(variant, *span);
            quote!(#krate::model::FieldKind::#variant)
        }
        None => quote!(<#ty as #krate::model::FieldType>::KIND),
    };

    let mut declaration = quote! {
        #krate::model::FieldDecl::new(
            #name,
            #kind,
            |model: &Self| #krate::__private::serde_json::to_value(&model.#member),
            |model: &mut Self, value| {
                model.#member = #krate::__private::serde_json::from_value(value)?;
                ::core::result::Result::Ok(())
            },
        )
    };

    if let Some(wire_name) = attrs.rename.as_ref().or(attrs.serde_rename.as_ref()) {
        declaration = quote!(#declaration.rename(#wire_name));
    }
    if attrs.id {
        declaration = quote!(#declaration.identifier());
    }

    Ok(declaration)
}

fn container_attrs(input: &DeriveInput) -> Result<ContainerAttrs> {
    let mut attrs = ContainerAttrs {
        index: None,
        krate: syn::parse_quote!(::searchlayer),
    };

    for attr in input.attrs.iter().filter(|attr| attr.path().is_ident("model")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("index") {
                attrs.index = Some(string_value(&meta)?);
                Ok(())
            } else if meta.path.is_ident("crate") {
                attrs.krate = meta.value()?.parse::<LitStr>()?.parse()?;
                Ok(())
            } else {
                Err(meta.error("unsupported model attribute; expected `index` or `crate`"))
            }
        })?;
    }

    Ok(attrs)
}

fn field_attrs(field: &Field) -> Result<FieldAttrs> {
    let mut attrs = FieldAttrs::default();

    for attr in &field.attrs {
        if attr.path().is_ident("model") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    attrs.id = true;
                } else if meta.path.is_ident("skip") {
                    attrs.skip = true;
                } else if meta.path.is_ident("rename") {
                    attrs.rename = Some(string_value(&meta)?);
                } else if meta.path.is_ident("kind") {
                    let lit = meta.value()?.parse::<LitStr>()?;
                    attrs.kind = Some((lit.value(), lit.span()));
                } else {
                    return Err(meta.error("unsupported model field attribute"));
                }
                Ok(())
            })?;
        } else if attr.path().is_ident("serde") {
            // Only `rename = "..."` matters here; everything else belongs to serde.
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") && meta.input.peek(syn::Token![=]) {
                    attrs.serde_rename = Some(string_value(&meta)?);
                } else {
                    skip_meta(&meta)?;
                }
                Ok(())
            })?;
        }
    }

    Ok(attrs)
}

fn string_value(meta: &ParseNestedMeta) -> Result<String> {
    Ok(meta.value()?.parse::<LitStr>()?.value())
}

fn skip_meta(meta: &ParseNestedMeta) -> Result<()> {
    if meta.input.peek(syn::Token![=]) {
        meta.value()?.parse::<syn::Expr>()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|nested| skip_meta(&nested))?;
    }
    Ok(())
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, ch) in name.char_indices() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}
