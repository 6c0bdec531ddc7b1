use proc_macro::TokenStream;
use quote::quote;
use syn::{
    ext::IdentExt, parse_macro_input, parse_quote, Data, DeriveInput, Error, Fields, LitStr,
    Result as SynResult, Visibility,
};

#[derive(Default)]
struct FieldAttrs {
    check: Option<LitStr>,
    embed: bool,
    opaque: bool,
    skip: bool,
}

fn field_attrs(field: &syn::Field) -> SynResult<FieldAttrs> {
    let mut attrs = FieldAttrs::default();
    for attr in &field.attrs {
        if !attr.path().is_ident("puzzle") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("check") {
                attrs.check = Some(meta.value()?.parse()?);
            } else if meta.path.is_ident("embed") {
                attrs.embed = true;
            } else if meta.path.is_ident("opaque") {
                attrs.opaque = true;
            } else if meta.path.is_ident("skip") {
                attrs.skip = true;
            } else {
                return Err(meta.error(
                    "unsupported puzzle attribute, expected one of `check`, `embed`, `opaque`, `skip`",
                ));
            }
            Ok(())
        })?;
    }
    if attrs.embed && attrs.opaque {
        return Err(Error::new_spanned(
            field,
            "`embed` and `opaque` cannot be combined on one field",
        ));
    }
    Ok(attrs)
}

/// Derives `puzzle::reflect::Reflect` and `puzzle::reflect::Field` for a struct with named fields.
///
/// Field attributes:
/// - `#[puzzle(check = "min=1,max=1000,request")]` attaches validation rules
/// - `#[puzzle(embed)]` makes the field's own fields transparent for copy matching
/// - `#[puzzle(opaque)]` for field types that do not implement `Field`
/// - `#[puzzle(skip)]` leaves the field out of the descriptor entirely
#[proc_macro_derive(Reflect, attributes(puzzle))]
pub fn derive_reflect(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> SynResult<proc_macro2::TokenStream> {
    let name = &input.ident;
    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => {
                return Err(Error::new_spanned(
                    name,
                    "Reflect can only be derived for structs with named fields",
                ))
            }
        },
        _ => {
            return Err(Error::new_spanned(
                name,
                "Reflect can only be derived for structs",
            ))
        }
    };

    let mut infos = Vec::new();
    for field in fields {
        let attrs = field_attrs(field)?;
        if attrs.skip {
            continue;
        }
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| Error::new_spanned(field, "expected a named field"))?;
        let ty = &field.ty;
        let label = ident.unraw().to_string();
        let get = quote! {
            |owner| owner
                .downcast_ref::<Self>()
                .map(|s| &s.#ident as &dyn ::std::any::Any)
        };
        let get_mut = quote! {
            |owner| owner
                .downcast_mut::<Self>()
                .map(|s| &mut s.#ident as &mut dyn ::std::any::Any)
        };
        let exported = matches!(field.vis, Visibility::Public(_));
        let mut info = match (exported, attrs.opaque) {
            (true, false) => quote! {
                ::puzzle::reflect::FieldInfo::exported::<#ty>(#label, #get, #get_mut)
            },
            (true, true) => quote! {
                ::puzzle::reflect::FieldInfo::exported_opaque::<#ty>(#label, #get, #get_mut)
            },
            (false, false) => quote! {
                ::puzzle::reflect::FieldInfo::unexported::<#ty>(#label, #get)
            },
            (false, true) => quote! {
                ::puzzle::reflect::FieldInfo::unexported_opaque::<#ty>(#label, #get)
            },
        };
        if let Some(check) = attrs.check {
            info = quote! { #info.check(#check) };
        }
        if attrs.embed {
            info = quote! { #info.embed(<#ty as ::puzzle::reflect::Reflect>::struct_info) };
        }
        infos.push(info);
    }

    let mut generics = input.generics.clone();
    generics
        .make_where_clause()
        .predicates
        .push(parse_quote!(Self: 'static));
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let mut field_generics = generics.clone();
    field_generics
        .make_where_clause()
        .predicates
        .push(parse_quote!(Self: ::std::clone::Clone));
    let field_where = &field_generics.where_clause;

    let type_name = name.to_string();
    Ok(quote! {
        impl #impl_generics ::puzzle::reflect::Reflect for #name #ty_generics #where_clause {
            fn struct_info() -> ::puzzle::reflect::StructInfo {
                ::puzzle::reflect::StructInfo::new::<Self>(#type_name, ::std::vec![#(#infos),*])
            }
        }

        impl #impl_generics ::puzzle::reflect::Field for #name #ty_generics #field_where {
            fn kind() -> ::puzzle::reflect::Kind {
                ::puzzle::reflect::Kind::Struct
            }

            fn value(&self) -> ::puzzle::reflect::Value<'_> {
                ::puzzle::reflect::Value::Struct(#type_name)
            }
        }
    })
}
