use darling::ast::{Data, Style};
use darling::util::Flag;
use darling::{FromDeriveInput, FromField};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Generics, Ident, Type};

#[derive(FromDeriveInput)]
#[darling(attributes(inject), supports(struct_any))]
struct InjectableInput {
    ident: Ident,
    generics: Generics,
    data: Data<(), InjectField>,
}

#[derive(FromField)]
#[darling(attributes(inject))]
struct InjectField {
    ident: Option<Ident>,
    ty: Type,
    name: Option<String>,
    default: Flag,
}

pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    let expanded = match InjectableInput::from_derive_input(&input) {
        Ok(parsed) => generate_injectable_impl(parsed).unwrap_or_else(syn::Error::into_compile_error),
        Err(err) => err.write_errors(),
    };
    TokenStream::from(expanded)
}

fn generate_injectable_impl(input: InjectableInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match input.data {
        Data::Struct(fields) => fields,
        Data::Enum(_) => unreachable!("darling only accepts structs here"),
    };
    let style = fields.style;

    let mut params = Vec::new();
    let mut values = Vec::new();
    for (index, field) in fields.fields.into_iter().enumerate() {
        let param_name = match &field.ident {
            Some(ident) => ident.to_string(),
            None => index.to_string(),
        };
        let (param, value) = field_injection(&field, &param_name)?;
        params.push(param);
        values.push(match &field.ident {
            Some(ident) => quote!(#ident: #value),
            None => value,
        });
    }

    let construct = match style {
        Style::Struct => quote!(Self { #(#values),* }),
        Style::Tuple => quote!(Self(#(#values),*)),
        Style::Unit => quote!(Self),
    };

    Ok(quote! {
        impl #impl_generics ::axum_boot::di::Injectable for #struct_name #ty_generics #where_clause {
            fn signature() -> ::axum_boot::di::Signature {
                ::axum_boot::di::Signature::of::<Self>()
                    #(.param(#params))*
            }

            #[allow(unused_mut, unused_variables)]
            fn construct(mut args: ::axum_boot::di::Args) -> ::axum_boot::Result<Self> {
                ::core::result::Result::Ok(#construct)
            }
        }
    })
}

/// Descriptor entry and constructor expression of one field.
fn field_injection(field: &InjectField, name: &str) -> syn::Result<(TokenStream2, TokenStream2)> {
    let ty = &field.ty;

    if field.default.is_present() {
        if field.name.is_some() {
            return Err(syn::Error::new_spanned(
                ty,
                "`default` and `name` cannot be combined: defaults are never injected",
            ));
        }
        return Ok((
            quote!(::axum_boot::di::Param::new(#name)
                .with_default(<#ty as ::core::default::Default>::default)),
            quote!(args.take::<#ty>(#name)?),
        ));
    }

    match (arc_inner(ty), &field.name) {
        (Some(inner), Some(qualifier)) => Ok((
            quote!(::axum_boot::di::Param::qualified::<#inner>(#name, #qualifier)),
            quote!(args.get::<#inner>(#name)?),
        )),
        (Some(inner), None) => Ok((
            quote!(::axum_boot::di::Param::typed::<#inner>(#name)),
            quote!(args.get::<#inner>(#name)?),
        )),
        (None, Some(_)) => Err(syn::Error::new_spanned(
            ty,
            "qualified injection needs an `Arc<T>` field",
        )),
        // Neither injectable nor defaulted; resolution reports it.
        (None, None) => Ok((
            quote!(::axum_boot::di::Param::new(#name)),
            quote!(args.take::<#ty>(#name)?),
        )),
    }
}

/// `T` of an `Arc<T>` field, `dyn Trait` included.
fn arc_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != "Arc" {
        return None;
    }
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => match args.args.first()? {
            syn::GenericArgument::Type(inner) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}
