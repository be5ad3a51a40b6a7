// The `quote!` macro requires deep recursion.
#![recursion_limit = "4096"]

extern crate proc_macro;

use anyhow::{bail, Error};
use field::{inner_type, Kind};
use itertools::Itertools;
use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DataEnum, DataStruct, DeriveInput, Expr, Fields, FieldsNamed, Ident, Variant};

mod field;
use crate::field::Field;

fn try_message(input: TokenStream) -> Result<TokenStream, Error> {
    let input: DeriveInput = syn::parse(input)?;

    let ident = input.ident;
    let name = ident.to_string();

    let variant_data = match input.data {
        Data::Struct(variant_data) => variant_data,
        Data::Enum(..) => bail!("Message can not be derived for an enum"),
        Data::Union(..) => bail!("Message can not be derived for a union"),
    };

    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let fields = match variant_data {
        DataStruct {
            fields: Fields::Named(FieldsNamed { named: fields, .. }),
            ..
        } => fields.into_iter().collect::<Vec<_>>(),
        DataStruct {
            fields: Fields::Unit, ..
        } => Vec::new(),
        _ => bail!("Message can only be derived for structs with named fields"),
    };

    // Fields keep their declaration order, which is also the encoding order.
    let fields = fields
        .into_iter()
        .map(|field| {
            let Some(field_ident) = field.ident else {
                bail!("message {} has an unnamed field", ident)
            };
            match Field::new(field.attrs) {
                Ok(parsed) => Ok((field_ident, parsed, field.ty)),
                Err(err) => Err(err.context(format!("invalid message field {}.{}", ident, field_ident))),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    if let Some((tag, _)) = fields
        .iter()
        .map(|(_, field, _)| field.tag)
        .sorted_unstable()
        .tuple_windows()
        .find(|(a, b)| a == b)
    {
        bail!("message {} has fields with duplicate tag {}", ident, tag);
    }

    let declare = fields
        .iter()
        .map(|(field_ident, field, ty)| {
            let field_name = field_ident.to_string();
            let tag = field.tag;
            let field_type = field.field_type(inner_type(&field.kind, ty)?);
            let label = field.label();
            let options = field.options();
            Ok(quote!(.field(::wireproto::Field::new(#field_type, #field_name, #tag, #label, #options))))
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let set = fields.iter().map(|(field_ident, field, _)| {
        let field_name = field_ident.to_string();
        match field.kind {
            Kind::Single => quote! {
                msg.set(#field_name, ::wireproto::FieldValue::to_value(&self.#field_ident)?)?;
            },
            Kind::Optional => quote! {
                if let ::core::option::Option::Some(value) = &self.#field_ident {
                    msg.set(#field_name, ::wireproto::FieldValue::to_value(value)?)?;
                }
            },
            Kind::Repeated => quote! {
                msg.set(
                    #field_name,
                    ::wireproto::Value::List(
                        self.#field_ident
                            .iter()
                            .map(::wireproto::FieldValue::to_value)
                            .collect::<::core::result::Result<_, _>>()?,
                    ),
                )?;
            },
        }
    });

    let get = fields.iter().map(|(field_ident, field, _)| {
        let field_name = field_ident.to_string();
        let read = match field.kind {
            Kind::Single => quote! {
                match msg.get(#field_name) {
                    ::core::option::Option::Some(value) => ::wireproto::FieldValue::from_value(value)?,
                    ::core::option::Option::None => {
                        return ::core::result::Result::Err(::wireproto::DecodeError::MissingRequired {
                            field: ::wireproto::__private::String::from(#field_name),
                        })
                    }
                }
            },
            Kind::Optional => quote! {
                msg.get(#field_name).map(::wireproto::FieldValue::from_value).transpose()?
            },
            Kind::Repeated => quote! {
                match msg.get(#field_name) {
                    ::core::option::Option::Some(::wireproto::Value::List(values)) => {
                        ::wireproto::RepeatedValue::from_values(values)?
                    }
                    ::core::option::Option::Some(_) => {
                        return ::core::result::Result::Err(::wireproto::DecodeError::TypeMismatch {
                            field: ::wireproto::__private::String::from(#field_name),
                            expected: "list",
                        })
                    }
                    ::core::option::Option::None => ::core::default::Default::default(),
                }
            },
        };
        quote!(#field_ident: #read,)
    });

    let expanded = quote! {
        impl #impl_generics ::wireproto::Message for #ident #ty_generics #where_clause {
            fn schema() -> ::core::result::Result<
                ::wireproto::__private::Arc<::wireproto::MessageSchema>,
                ::wireproto::DefinitionError,
            > {
                ::wireproto::MessageSchema::builder(#name)
                    #(#declare)*
                    .build()
            }

            fn to_dynamic(&self) -> ::core::result::Result<::wireproto::DynamicMessage, ::wireproto::EncodeError> {
                #[allow(unused_mut)]
                let mut msg = ::wireproto::DynamicMessage::new(<Self as ::wireproto::Message>::schema()?);
                #(#set)*
                ::core::result::Result::Ok(msg)
            }

            fn from_dynamic(msg: &::wireproto::DynamicMessage) -> ::core::result::Result<Self, ::wireproto::DecodeError> {
                let _ = msg;
                ::core::result::Result::Ok(Self {
                    #(#get)*
                })
            }
        }

        impl #impl_generics ::wireproto::FieldValue for #ident #ty_generics #where_clause {
            fn to_value(&self) -> ::core::result::Result<::wireproto::Value, ::wireproto::EncodeError> {
                ::core::result::Result::Ok(::wireproto::Value::Message(::wireproto::Message::to_dynamic(self)?))
            }

            fn from_value(value: &::wireproto::Value) -> ::core::result::Result<Self, ::wireproto::DecodeError> {
                match value.as_message() {
                    ::core::option::Option::Some(msg) => ::wireproto::Message::from_dynamic(msg),
                    ::core::option::Option::None => ::core::result::Result::Err(
                        ::wireproto::DecodeError::UnexpectedValue { expected: "embedded message" },
                    ),
                }
            }
        }
    };

    Ok(expanded.into())
}

#[proc_macro_derive(Message, attributes(wireproto))]
pub fn message(input: TokenStream) -> TokenStream {
    try_message(input).unwrap()
}

fn try_enumeration(input: TokenStream) -> Result<TokenStream, Error> {
    let input: DeriveInput = syn::parse(input)?;
    let ident = input.ident;
    let name = ident.to_string();

    let generics = &input.generics;
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let punctuated_variants = match input.data {
        Data::Enum(DataEnum { variants, .. }) => variants,
        Data::Struct(_) => bail!("Enumeration can not be derived for a struct"),
        Data::Union(..) => bail!("Enumeration can not be derived for a union"),
    };

    // Map the variants into 'fields'.
    let mut variants: Vec<(Ident, Expr)> = Vec::new();
    for Variant {
        ident,
        fields,
        discriminant,
        ..
    } in punctuated_variants
    {
        match fields {
            Fields::Unit => (),
            Fields::Named(_) | Fields::Unnamed(_) => {
                bail!("Enumeration variants may not have fields")
            }
        }

        match discriminant {
            Some((_, expr)) => variants.push((ident, expr)),
            None => bail!("Enumeration variants must have a discriminant"),
        }
    }

    if variants.is_empty() {
        bail!("Enumeration must have at least one variant");
    }

    let values = variants.iter().map(|(variant, value)| {
        let variant_name = variant.to_string();
        quote!(.value(#variant_name, #value))
    });

    let to_i32 = variants
        .iter()
        .map(|(variant, value)| quote!(#ident::#variant => #value));

    let from_i32 = variants
        .iter()
        .map(|(variant, value)| quote!(v if v == (#value) => ::core::option::Option::Some(#ident::#variant)));

    let expanded = quote! {
        impl #impl_generics ::wireproto::Enumeration for #ident #ty_generics #where_clause {
            fn descriptor() -> ::wireproto::__private::Arc<::wireproto::EnumDescriptor> {
                ::wireproto::__private::Arc::new(::wireproto::EnumDescriptor::new(#name) #(#values)*)
            }

            fn to_i32(&self) -> i32 {
                match self {
                    #(#to_i32,)*
                }
            }

            fn from_i32(value: i32) -> ::core::option::Option<Self> {
                match value {
                    #(#from_i32,)*
                    _ => ::core::option::Option::None,
                }
            }
        }

        impl #impl_generics ::wireproto::FieldValue for #ident #ty_generics #where_clause {
            fn to_value(&self) -> ::core::result::Result<::wireproto::Value, ::wireproto::EncodeError> {
                ::core::result::Result::Ok(::wireproto::Value::Int(::wireproto::Enumeration::to_i32(self) as i128))
            }

            fn from_value(value: &::wireproto::Value) -> ::core::result::Result<Self, ::wireproto::DecodeError> {
                let value = value
                    .as_int()
                    .ok_or(::wireproto::DecodeError::UnexpectedValue { expected: "integer" })?;
                let value = ::wireproto::validate_int32(value)?;
                <Self as ::wireproto::Enumeration>::from_i32(value)
                    .ok_or(::wireproto::DecodeError::UnknownEnumValue { name: #name, value })
            }
        }
    };

    Ok(expanded.into())
}

#[proc_macro_derive(Enumeration, attributes(wireproto))]
pub fn enumeration(input: TokenStream) -> TokenStream {
    try_enumeration(input).unwrap()
}
