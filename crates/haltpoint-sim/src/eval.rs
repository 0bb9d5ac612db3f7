use crate::error::EvalError;
use crate::value::SimValue;

/// Comparison operators, two-character ones first.
const OPERATORS: [&str; 6] = ["==", "!=", "<=", ">=", "<", ">"];

/// Evaluates a condition within the given scope.
///
/// Supported expressions are `true`, `false`, `name` (truthiness of a local
/// variable) and `name <op> integer` with `<op>` among `== != < <= > >=`.
pub(crate) fn evaluate(expression: &str, binding: Option<&SimValue>) -> Result<bool, EvalError> {
    let expression = expression.trim();

    let Some((op, index)) = OPERATORS
        .iter()
        .find_map(|op| expression.find(op).map(|index| (*op, index)))
    else {
        return match expression {
            "true" => Ok(true),
            "false" => Ok(false),
            name if is_identifier(name) => Ok(lookup(name, binding)?.is_truthy()),
            _ => Err(EvalError::Malformed(expression.to_owned())),
        };
    };

    let name = expression[..index].trim();
    let operand = expression[index + op.len()..].trim();

    if !is_identifier(name) {
        return Err(EvalError::Malformed(expression.to_owned()));
    }

    let operand: i64 = operand
        .parse()
        .map_err(|_| EvalError::Malformed(expression.to_owned()))?;

    let SimValue::Int(value) = *lookup(name, binding)? else {
        return Err(EvalError::NotAnInteger(name.to_owned()));
    };

    Ok(match op {
        "==" => value == operand,
        "!=" => value != operand,
        "<=" => value <= operand,
        ">=" => value >= operand,
        "<" => value < operand,
        _ => value > operand,
    })
}

fn lookup<'a>(name: &str, binding: Option<&'a SimValue>) -> Result<&'a SimValue, EvalError> {
    binding
        .and_then(|binding| binding.local(name))
        .ok_or_else(|| EvalError::UnknownName(name.to_owned()))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
