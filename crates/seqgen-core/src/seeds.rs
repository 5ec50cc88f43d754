//! Built-in seed sequences.

use std::sync::Arc;

use seqgen_types::{Operation, PrimitiveType, Type, Value};

use crate::errors::{GeneratorError, SequenceError};
use crate::sequence::Sequence;

const NUMBERS: [i8; 5] = [-1, 0, 1, 10, 100];
const CHARS: [char; 4] = ['#', ' ', '4', 'a'];
const STRINGS: [&str; 2] = ["", "hi!"];

/// One single-literal sequence per value.
pub fn literal_sequences(
    values: impl IntoIterator<Item = (Type, Value)>,
) -> Result<Vec<Sequence>, GeneratorError> {
    values
        .into_iter()
        .map(|(ty, value)| {
            let op = Operation::literal(ty, value)?;
            Ok(Sequence::literal(Arc::new(op))?)
        })
        .collect()
}

/// Small boundary values for every primitive type plus a couple of strings.
pub fn default_seeds() -> Result<Vec<Sequence>, GeneratorError> {
    let mut values: Vec<(Type, Value)> = Vec::new();
    for n in NUMBERS {
        values.push((Type::Primitive(PrimitiveType::Byte), Value::Byte(n)));
        values.push((Type::Primitive(PrimitiveType::Short), Value::Short(n.into())));
        values.push((Type::int(), Value::Int(n.into())));
        values.push((Type::long(), Value::Long(n.into())));
        values.push((Type::Primitive(PrimitiveType::Float), Value::Float(n.into())));
        values.push((Type::double(), Value::Double(n.into())));
    }
    for c in CHARS {
        values.push((Type::Primitive(PrimitiveType::Char), Value::Char(c)));
    }
    for b in [true, false] {
        values.push((Type::boolean(), Value::Boolean(b)));
    }
    for s in STRINGS {
        values.push((Type::string(), Value::Str(s.to_string())));
    }
    literal_sequences(values)
}

/// Parse seeds from their text form, one sequence per block separated by a
/// blank line.
pub fn parse_seeds(text: &str) -> Result<Vec<Sequence>, SequenceError> {
    text.split("\n\n")
        .filter(|block| !block.trim().is_empty())
        .map(str::parse)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_seeds_are_distinct_single_literals() {
        let seeds = default_seeds().unwrap();
        assert_eq!(seeds.len(), 5 * 6 + 4 + 2 + 2);
        assert!(seeds.iter().all(|s| s.len() == 1 && s.statements()[0].is_literal()));
        let unique: HashSet<_> = seeds.iter().collect();
        assert_eq!(unique.len(), seeds.len());
    }

    #[test]
    fn test_literal_sequences_reject_bad_values() {
        assert!(matches!(
            literal_sequences([(Type::int(), Value::Long(3))]),
            Err(GeneratorError::Literal(_))
        ));
        let ok = literal_sequences([(Type::reference("Account"), Value::Null)]).unwrap();
        assert_eq!(ok[0].to_string(), "var0 = prim:Account:null :\n");
    }

    #[test]
    fn test_parse_seed_blocks() {
        let text = "var0 = prim:int:3 :\n\nvar0 = prim:String:\"x\" :\nvar1 = prim:int:4 :\n";
        let seeds = parse_seeds(text).unwrap();
        assert_eq!(seeds.len(), 2);
        assert_eq!(seeds[1].len(), 2);
    }
}
