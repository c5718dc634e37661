//! Parser for the annotated circuit source
//!
//! The circuit program is a single Rust struct. The struct carries
//! `#[zk_circuit(version = N)]` and each field carries `zk_*` annotations
//! describing its visibility and the relation it satisfies. Attributes outside
//! the `zk_` namespace are ignored.

use crate::error::{CircuitError, Result};
use quote::ToTokens;
use syn::{Attribute, Field, Fields, Ident, Item, ItemStruct, LitInt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldAnnotation {
    Private,
    Public,
    Range { bits: u32 },
    Parity { of: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedField {
    pub name: String,
    pub field_type: String,
    pub annotations: Vec<FieldAnnotation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCircuit {
    pub circuit_name: String,
    pub version: Option<u32>,
    pub fields: Vec<ParsedField>,
}

pub fn parse_circuit(input: &str) -> Result<ParsedCircuit> {
    let ast: syn::File = syn::parse_str(input)?;

    let mut structs = ast.items.iter().filter_map(|item| match item {
        Item::Struct(s) => Some(s),
        _ => None,
    });

    let item_struct = structs
        .next()
        .ok_or_else(|| CircuitError::ParseError("No struct found in circuit source".to_string()))?;

    if structs.next().is_some() {
        return Err(CircuitError::ParseError(
            "Circuit source must contain exactly one struct".to_string(),
        ));
    }

    parse_struct(item_struct)
}

fn parse_struct(item_struct: &ItemStruct) -> Result<ParsedCircuit> {
    let circuit_name = item_struct.ident.to_string();
    let version = parse_circuit_version(&item_struct.attrs)?;

    let named = match &item_struct.fields {
        Fields::Named(fields) => fields,
        _ => {
            return Err(CircuitError::InvalidShape(format!(
                "Circuit '{}' must use named fields",
                circuit_name
            )))
        }
    };

    let mut fields = Vec::with_capacity(named.named.len());
    for field in &named.named {
        let name = field
            .ident
            .as_ref()
            .ok_or_else(|| CircuitError::ParseError("Field has no name".to_string()))?
            .to_string();

        fields.push(ParsedField {
            name,
            field_type: extract_type_name(field),
            annotations: parse_field_annotations(&field.attrs)?,
        });
    }

    Ok(ParsedCircuit { circuit_name, version, fields })
}

fn attribute_name(attr: &Attribute) -> String {
    attr.path().to_token_stream().to_string().replace(' ', "")
}

fn is_zk_attribute(attr: &Attribute) -> bool {
    attr.path().get_ident().map(|ident| ident.to_string().starts_with("zk_")).unwrap_or(false)
}

fn parse_circuit_version(attrs: &[Attribute]) -> Result<Option<u32>> {
    let mut version = None;

    for attr in attrs.iter().filter(|a| is_zk_attribute(a)) {
        if !attr.path().is_ident("zk_circuit") {
            return Err(CircuitError::InvalidAnnotation(format!(
                "Unknown struct annotation '{}'",
                attribute_name(attr)
            )));
        }
        if version.is_some() {
            return Err(CircuitError::InvalidAnnotation(
                "zk_circuit may only appear once".to_string(),
            ));
        }

        let mut declared = None;
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("version") {
                let lit: LitInt = meta.value()?.parse()?;
                declared = Some(lit.base10_parse::<u32>()?);
                Ok(())
            } else {
                Err(meta.error("unsupported zk_circuit property"))
            }
        })?;

        version = Some(declared.ok_or_else(|| {
            CircuitError::InvalidAnnotation("zk_circuit requires version = N".to_string())
        })?);
    }

    Ok(version)
}

fn parse_field_annotations(attrs: &[Attribute]) -> Result<Vec<FieldAnnotation>> {
    let mut annotations = Vec::new();

    for attr in attrs.iter().filter(|a| is_zk_attribute(a)) {
        let annotation = match attribute_name(attr).as_str() {
            "zk_private" => {
                attr.meta.require_path_only()?;
                FieldAnnotation::Private
            }
            "zk_public" => {
                attr.meta.require_path_only()?;
                FieldAnnotation::Public
            }
            "zk_range" => parse_range(attr)?,
            "zk_parity" => parse_parity(attr)?,
            other => {
                return Err(CircuitError::InvalidAnnotation(format!(
                    "Unknown field annotation '{}'",
                    other
                )))
            }
        };
        annotations.push(annotation);
    }

    Ok(annotations)
}

fn parse_range(attr: &Attribute) -> Result<FieldAnnotation> {
    let mut bits = None;
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("bits") {
            let lit: LitInt = meta.value()?.parse()?;
            bits = Some(lit.base10_parse::<u32>()?);
            Ok(())
        } else {
            Err(meta.error("unsupported zk_range property"))
        }
    })?;

    bits.map(|bits| FieldAnnotation::Range { bits })
        .ok_or_else(|| CircuitError::InvalidAnnotation("zk_range requires bits = N".to_string()))
}

fn parse_parity(attr: &Attribute) -> Result<FieldAnnotation> {
    let mut source = None;
    attr.parse_nested_meta(|meta| {
        if meta.path.is_ident("of") {
            let ident: Ident = meta.value()?.parse()?;
            source = Some(ident.to_string());
            Ok(())
        } else {
            Err(meta.error("unsupported zk_parity property"))
        }
    })?;

    source
        .map(|of| FieldAnnotation::Parity { of })
        .ok_or_else(|| CircuitError::InvalidAnnotation("zk_parity requires of = <field>".to_string()))
}

fn extract_type_name(field: &Field) -> String {
    field.ty.to_token_stream().to_string().replace(' ', "")
}
