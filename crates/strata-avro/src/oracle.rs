//! [`AvroOracle`]: parse, resolve, and compare Avro schemas.

use std::collections::HashMap;

use apache_avro::{
  Schema,
  schema::{Name, RecordSchema, UnionSchema},
  schema_compatibility::SchemaCompatibility,
};
use strata_core::{
  compatibility::{CompatibilityOracle, SchemaText, Verdict},
  value::SchemaType,
};

use crate::{Error, Result};

/// Record wrapped around a referencing schema so that it can be parsed in one
/// list with its dependencies. It has no namespace, so unqualified names in
/// the wrapped body resolve exactly as they would at the top level.
const ROOT: &str = "__StrataRoot";

/// Answers compatibility questions for Avro schemas.
///
/// Other formats are rejected at validation time and are never compatible
/// with anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct AvroOracle;

impl AvroOracle {
  pub fn new() -> Self { Self }

  /// Parse `schema` as an Avro schema of the given format.
  ///
  /// Named types taken from the dependencies are inlined, so the result
  /// carries their full structure rather than bare name references.
  pub fn parse(format: SchemaType, schema: SchemaText<'_>) -> Result<Schema> {
    if format != SchemaType::Avro {
      return Err(Error::Unsupported(format));
    }
    if schema.dependencies.is_empty() {
      return Ok(Schema::parse_str(schema.text)?);
    }

    let root = format!(
      r#"{{"type":"record","name":"{ROOT}","fields":[{{"name":"value","type":{}}}]}}"#,
      schema.text
    );
    let mut inputs: Vec<&str> = schema.dependencies.iter().map(String::as_str).collect();
    inputs.push(&root);

    let mut parsed = Schema::parse_list(&inputs)?;
    let body = match parsed.pop() {
      Some(Schema::Record(RecordSchema { mut fields, .. })) => fields.pop().map(|f| f.schema),
      _ => None,
    };
    let Some(body) = body else {
      return Err(Error::Detached);
    };

    let mut named = HashMap::new();
    for dependency in &parsed {
      collect_named(dependency, &mut named);
    }
    inline(body, &named, &mut Vec::new())
  }
}

/// Every named type defined in `schema`, nested ones included.
fn collect_named(schema: &Schema, named: &mut HashMap<Name, Schema>) {
  match schema {
    Schema::Record(r) => {
      named.insert(r.name.clone(), schema.clone());
      for field in &r.fields {
        collect_named(&field.schema, named);
      }
    }
    Schema::Enum(e) => {
      named.insert(e.name.clone(), schema.clone());
    }
    Schema::Fixed(f) => {
      named.insert(f.name.clone(), schema.clone());
    }
    Schema::Array(a) => collect_named(&a.items, named),
    Schema::Map(m) => collect_named(&m.types, named),
    Schema::Union(u) => u.variants().iter().for_each(|v| collect_named(v, named)),
    _ => {}
  }
}

/// Replace references to `named` types with their definitions. A reference
/// back into a record that is still being expanded stays a reference.
fn inline(schema: Schema, named: &HashMap<Name, Schema>, open: &mut Vec<Name>) -> Result<Schema> {
  match schema {
    Schema::Ref { name } => match named.get(&name) {
      Some(definition) if !open.contains(&name) => inline(definition.clone(), named, open),
      _ => Ok(Schema::Ref { name }),
    },
    Schema::Record(mut r) => {
      open.push(r.name.clone());
      let fields = std::mem::take(&mut r.fields);
      for mut field in fields {
        field.schema = inline(field.schema, named, open)?;
        r.fields.push(field);
      }
      open.pop();
      Ok(Schema::Record(r))
    }
    Schema::Array(mut a) => {
      a.items = Box::new(inline(*a.items, named, open)?);
      Ok(Schema::Array(a))
    }
    Schema::Map(mut m) => {
      m.types = Box::new(inline(*m.types, named, open)?);
      Ok(Schema::Map(m))
    }
    Schema::Union(u) => {
      let variants = u
        .variants()
        .iter()
        .map(|v| inline(v.clone(), named, open))
        .collect::<Result<Vec<_>>>()?;
      Ok(Schema::Union(UnionSchema::new(variants)?))
    }
    other => Ok(other),
  }
}

impl CompatibilityOracle for AvroOracle {
  fn validate(&self, format: SchemaType, schema: SchemaText<'_>) -> Result<(), String> {
    Self::parse(format, schema).map(drop).map_err(|e| e.to_string())
  }

  fn can_read(&self, format: SchemaType, reader: SchemaText<'_>, writer: SchemaText<'_>) -> Verdict {
    let parsed = Self::parse(format, reader).and_then(|r| Ok((r, Self::parse(format, writer)?)));
    let (reader, writer) = match parsed {
      Ok(pair) => pair,
      Err(e) => {
        tracing::debug!(error = %e, "schema did not parse during resolution");
        return Verdict::Incompatible(e.to_string());
      }
    };
    match SchemaCompatibility::can_read(&writer, &reader) {
      Ok(()) => Verdict::Compatible,
      Err(e) => Verdict::Incompatible(e.to_string()),
    }
  }

  fn identical(&self, format: SchemaType, a: &str, b: &str) -> bool {
    match (Self::parse(format, SchemaText::new(a)), Self::parse(format, SchemaText::new(b))) {
      (Ok(a), Ok(b)) => a.canonical_form() == b.canonical_form(),
      _ => false,
    }
  }
}
