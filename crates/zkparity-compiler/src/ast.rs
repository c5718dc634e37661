//! AST transformation for the parity circuit
//!
//! Turns a [`ParsedCircuit`] into an intermediate representation (IR) and
//! enforces the one shape this toolkit compiles: a single range-bounded
//! private input and a single public bit equal to that input's parity.

use crate::error::{CircuitError, Result};
use crate::parser::{FieldAnnotation, ParsedCircuit, ParsedField};

/// Circuit program version understood by this compiler
pub const CIRCUIT_VERSION: u32 = 1;

/// Bit width of the private vote
pub const VOTE_BITS: u32 = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZkType {
    U8,
    Bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Constraint {
    /// Value decomposes into `bits` boolean wires
    RangeBits { bits: u32 },
    /// Value equals the lowest bit of `source`
    ParityOf { source: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZkField {
    pub name: String,
    pub field_type: ZkType,
    pub constraints: Vec<Constraint>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitIR {
    pub name: String,
    pub version: u32,
    pub private_input: ZkField,
    pub public_output: ZkField,
}

impl CircuitIR {
    pub fn range_bits(&self) -> u32 {
        self.private_input
            .constraints
            .iter()
            .find_map(|c| match c {
                Constraint::RangeBits { bits } => Some(*bits),
                _ => None,
            })
            .unwrap_or(VOTE_BITS)
    }
}

pub fn transform_to_ir(parsed: ParsedCircuit) -> Result<CircuitIR> {
    let version = parsed.version.ok_or_else(|| {
        CircuitError::InvalidAnnotation(format!(
            "Circuit '{}' is missing #[zk_circuit(version = N)]",
            parsed.circuit_name
        ))
    })?;
    if version != CIRCUIT_VERSION {
        return Err(CircuitError::VersionMismatch { expected: CIRCUIT_VERSION, found: version });
    }

    let mut private_fields = Vec::new();
    let mut public_fields = Vec::new();

    for field in &parsed.fields {
        match visibility(field)? {
            FieldAnnotation::Private => private_fields.push(field),
            _ => public_fields.push(field),
        }
    }

    if private_fields.len() != 1 {
        return Err(CircuitError::InvalidShape(format!(
            "expected exactly one #[zk_private] field, found {}",
            private_fields.len()
        )));
    }
    if public_fields.len() != 1 {
        return Err(CircuitError::InvalidShape(format!(
            "expected exactly one #[zk_public] field, found {}",
            public_fields.len()
        )));
    }

    let private_input = private_field_to_ir(private_fields[0])?;
    let public_output = public_field_to_ir(public_fields[0], &private_input.name)?;

    Ok(CircuitIR { name: parsed.circuit_name, version, private_input, public_output })
}

fn visibility(field: &ParsedField) -> Result<FieldAnnotation> {
    let marks: Vec<&FieldAnnotation> = field
        .annotations
        .iter()
        .filter(|a| matches!(a, FieldAnnotation::Private | FieldAnnotation::Public))
        .collect();

    match marks.as_slice() {
        [only] => Ok((*only).clone()),
        [] => Err(CircuitError::InvalidShape(format!(
            "field '{}' has no #[zk_private] or #[zk_public] annotation",
            field.name
        ))),
        _ => Err(CircuitError::InvalidAnnotation(format!(
            "field '{}' declares more than one visibility",
            field.name
        ))),
    }
}

fn parse_zk_type(type_str: &str) -> Result<ZkType> {
    match type_str {
        "u8" => Ok(ZkType::U8),
        "bool" => Ok(ZkType::Bool),
        _ => Err(CircuitError::UnsupportedType(format!(
            "Type '{}' is not supported in the parity circuit. Supported types: u8, bool",
            type_str
        ))),
    }
}

fn private_field_to_ir(field: &ParsedField) -> Result<ZkField> {
    let field_type = parse_zk_type(&field.field_type)?;
    if field_type != ZkType::U8 {
        return Err(CircuitError::UnsupportedType(format!(
            "private field '{}' must be u8, found {}",
            field.name, field.field_type
        )));
    }

    let mut bits = None;
    for annotation in &field.annotations {
        match annotation {
            FieldAnnotation::Private => {}
            FieldAnnotation::Range { bits: b } if bits.is_none() => bits = Some(*b),
            other => {
                return Err(CircuitError::InvalidAnnotation(format!(
                    "unexpected {:?} on private field '{}'",
                    other, field.name
                )))
            }
        }
    }

    match bits {
        Some(VOTE_BITS) => Ok(ZkField {
            name: field.name.clone(),
            field_type,
            constraints: vec![Constraint::RangeBits { bits: VOTE_BITS }],
        }),
        Some(other) => Err(CircuitError::InvalidShape(format!(
            "private field '{}' must be {} bits wide, found {}",
            field.name, VOTE_BITS, other
        ))),
        None => Err(CircuitError::InvalidShape(format!(
            "private field '{}' requires #[zk_range(bits = {})]",
            field.name, VOTE_BITS
        ))),
    }
}

fn public_field_to_ir(field: &ParsedField, private_name: &str) -> Result<ZkField> {
    let field_type = parse_zk_type(&field.field_type)?;
    if field_type != ZkType::Bool {
        return Err(CircuitError::UnsupportedType(format!(
            "public field '{}' must be bool, found {}",
            field.name, field.field_type
        )));
    }

    let mut source = None;
    for annotation in &field.annotations {
        match annotation {
            FieldAnnotation::Public => {}
            FieldAnnotation::Parity { of } if source.is_none() => source = Some(of.clone()),
            other => {
                return Err(CircuitError::InvalidAnnotation(format!(
                    "unexpected {:?} on public field '{}'",
                    other, field.name
                )))
            }
        }
    }

    let source = source.ok_or_else(|| {
        CircuitError::InvalidShape(format!(
            "public field '{}' requires #[zk_parity(of = {})]",
            field.name, private_name
        ))
    })?;

    if source != private_name {
        return Err(CircuitError::InvalidShape(format!(
            "public field '{}' takes the parity of unknown field '{}'",
            field.name, source
        )));
    }

    Ok(ZkField { name: field.name.clone(), field_type, constraints: vec![Constraint::ParityOf { source }] })
}
