use std::fmt;

use anyhow::{bail, Error};
use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;
use syn::{Attribute, GenericArgument, Lit, Meta, MetaList, NestedMeta, PathArguments, Type};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    Single,
    Repeated,
    Optional,
}

/// Scalar attribute names, the `FieldType` variant they map to, and whether they can be packed.
const SCALARS: &[(&str, &str, bool)] = &[
    ("bool", "Bool", true),
    ("int32", "Int32", true),
    ("int64", "Int64", true),
    ("uint32", "Uint32", true),
    ("uint64", "Uint64", true),
    ("sint32", "Sint32", true),
    ("sint64", "Sint64", true),
    ("fixed32", "Fixed32", true),
    ("fixed64", "Fixed64", true),
    ("sfixed32", "Sfixed32", true),
    ("sfixed64", "Sfixed64", true),
    ("float", "Float", true),
    ("double", "Double", true),
    ("string", "String", false),
    ("bytes", "Bytes", false),
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ty {
    Scalar { name: &'static str, variant: &'static str, packable: bool },
    Message,
    Enumeration,
}

impl Ty {
    fn name(&self) -> &'static str {
        match self {
            Ty::Scalar { name, .. } => name,
            Ty::Message => "message",
            Ty::Enumeration => "enumeration",
        }
    }

    fn is_packable(&self) -> bool {
        match self {
            Ty::Scalar { packable, .. } => *packable,
            Ty::Message => false,
            Ty::Enumeration => true,
        }
    }
}

#[derive(Clone)]
pub struct Field {
    pub kind: Kind,
    pub tag: u32,
    pub ty: Ty,
    pub packed: bool,
}

impl Field {
    pub fn new(attrs: Vec<Attribute>) -> Result<Self, Error> {
        let attrs = wireproto_attrs(attrs);

        let mut tag = None;
        let mut ty = None;
        let mut kind = None;
        let mut packed = None;
        let mut unknown_attrs = Vec::new();

        for attr in &attrs {
            if let Some(x) = tag_attr(attr)? {
                set_option(&mut tag, x, "duplicate tag attributes")?;
            } else if let Some(x) = ty_attr(attr) {
                set_option(&mut ty, x, "duplicate type attributes")?;
            } else if let Some(x) = kind_attr(attr) {
                set_option(&mut kind, x, "duplicate kind attribute")?;
            } else if attr.path().is_ident("packed") {
                set_option(&mut packed, true, "duplicate packed attribute")?;
            } else {
                unknown_attrs.push(attr);
            }
        }

        match unknown_attrs.len() {
            0 => (),
            1 => bail!("unknown attribute: {:?}", unknown_attrs[0]),
            _ => bail!("unknown attributes: {:?}", unknown_attrs),
        }

        let Some(tag) = tag else { bail!("missing tag attribute") };
        let Some(ty) = ty else { bail!("missing type attribute") };
        let kind = kind.unwrap_or(Kind::Single);
        let packed = packed.unwrap_or(false);

        if packed {
            if !ty.is_packable() {
                bail!(
                    "{} fields cannot be packed, only non length-delimited fields are valid",
                    ty.name()
                );
            }
            if kind != Kind::Repeated {
                bail!("packed fields must be repeated");
            }
        }

        Ok(Self { kind, tag, ty, packed })
    }

    /// Expression building the `FieldType` of this field, `inner` being the element type.
    pub fn field_type(&self, inner: &Type) -> TokenStream {
        match self.ty {
            Ty::Scalar { variant, .. } => {
                let variant = Ident::new(variant, Span::call_site());
                quote!(::wireproto::FieldType::#variant)
            }
            Ty::Message => quote!(::wireproto::FieldType::Message(<#inner as ::wireproto::Message>::schema()?)),
            Ty::Enumeration => {
                quote!(::wireproto::FieldType::Enum(<#inner as ::wireproto::Enumeration>::descriptor()))
            }
        }
    }

    pub fn label(&self) -> TokenStream {
        match self.kind {
            Kind::Single => quote!(::wireproto::Label::Required),
            Kind::Optional => quote!(::wireproto::Label::Optional),
            Kind::Repeated => quote!(::wireproto::Label::Repeated),
        }
    }

    pub fn options(&self) -> TokenStream {
        if self.packed {
            quote!(::wireproto::FieldOptions::new().packed())
        } else {
            quote!(::wireproto::FieldOptions::new())
        }
    }
}

/// The element type of a field: `T` for `Option<T>` and `Vec<T>`-like containers.
pub fn inner_type<'a>(kind: &Kind, ty: &'a Type) -> Result<&'a Type, Error> {
    if *kind == Kind::Single {
        return Ok(ty);
    }
    if let Type::Path(path) = ty {
        if let Some(segment) = path.path.segments.last() {
            if let PathArguments::AngleBracketed(args) = &segment.arguments {
                for arg in &args.args {
                    if let GenericArgument::Type(inner) = arg {
                        return Ok(inner);
                    }
                }
            }
        }
    }
    bail!("cannot find the element type of {}", quote!(#ty))
}

pub(super) fn tag_attr(attr: &Meta) -> Result<Option<u32>, Error> {
    if !attr.path().is_ident("tag") {
        return Ok(None);
    }
    match *attr {
        Meta::List(ref meta_list) => {
            if meta_list.nested.len() == 1 {
                if let NestedMeta::Lit(Lit::Int(ref lit)) = meta_list.nested[0] {
                    return Ok(Some(lit.base10_parse()?));
                }
            }
            bail!("invalid tag attribute: {:?}", attr);
        }
        Meta::NameValue(ref meta_name_value) => match meta_name_value.lit {
            Lit::Str(ref lit) => lit.value().parse::<u32>().map_err(Error::from).map(Option::Some),
            Lit::Int(ref lit) => Ok(Some(lit.base10_parse()?)),
            _ => bail!("invalid tag attribute: {:?}", attr),
        },
        _ => bail!("invalid tag attribute: {:?}", attr),
    }
}

fn ty_attr(attr: &Meta) -> Option<Ty> {
    let Meta::Path(ref path) = *attr else { return None };

    if path.is_ident("message") {
        return Some(Ty::Message);
    }
    if path.is_ident("enumeration") {
        return Some(Ty::Enumeration);
    }
    SCALARS
        .iter()
        .find(|(name, _, _)| path.is_ident(name))
        .map(|&(name, variant, packable)| Ty::Scalar {
            name,
            variant,
            packable,
        })
}

fn kind_attr(attr: &Meta) -> Option<Kind> {
    let Meta::Path(ref path) = *attr else { return None };

    if path.is_ident("repeated") {
        Some(Kind::Repeated)
    } else if path.is_ident("optional") {
        Some(Kind::Optional)
    } else {
        None
    }
}

pub fn set_option<T: fmt::Debug>(option: &mut Option<T>, value: T, message: &str) -> Result<(), Error> {
    if let Some(ref existing) = *option {
        bail!("{}: {:?} and {:?}", message, existing, value);
    }
    *option = Some(value);
    Ok(())
}

/// Get the items belonging to the 'wireproto' list attribute, e.g. `#[wireproto(tag = 1, string)]`.
fn wireproto_attrs(attrs: Vec<Attribute>) -> Vec<Meta> {
    attrs
        .iter()
        .flat_map(Attribute::parse_meta)
        .flat_map(|meta| match meta {
            Meta::List(MetaList { path, nested, .. }) => {
                if path.is_ident("wireproto") {
                    nested.into_iter().collect()
                } else {
                    Vec::new()
                }
            }
            _ => Vec::new(),
        })
        .flat_map(|attr| -> Result<_, _> {
            match attr {
                NestedMeta::Meta(attr) => Ok(attr),
                NestedMeta::Lit(lit) => bail!("invalid wireproto attribute: {:?}", lit),
            }
        })
        .collect()
}
