//! String arguments to typed ABI values
//!
//! Arguments arrive from the command line as text and are coerced against the
//! parameter types the ABI declares.

use alloy_dyn_abi::{DynSolType, DynSolValue, FunctionExt, JsonAbiExt, Specifier};
use alloy_json_abi::{Function, JsonAbi, Param};
use alloy_primitives::hex;
use thiserror::Error;

/// Errors turning text arguments into ABI-encoded calldata
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArgError {
    #[error("Method {0} is not in the contract ABI")]
    UnknownMethod(String),
    #[error("Method {method} takes {expected} argument(s), got {given}")]
    ArityMismatch {
        method: String,
        expected: String,
        given: usize,
    },
    #[error("Argument {index} ({param_type}) {value:?} is invalid: {reason}")]
    InvalidArgument {
        index: usize,
        param_type: String,
        value: String,
        reason: String,
    },
    #[error("Unsupported parameter type {param_type}: {reason}")]
    UnsupportedType { param_type: String, reason: String },
    #[error("Failed to encode arguments for {method}: {reason}")]
    Encode { method: String, reason: String },
    #[error("Failed to decode return data of {method}: {reason}")]
    Decode { method: String, reason: String },
}

/// Find the function `name` that accepts `argc` arguments.
///
/// Overloads are distinguished by arity only; two overloads with the same
/// arity resolve to the first one declared.
pub fn resolve_function<'a>(
    abi: &'a JsonAbi,
    name: &str,
    argc: usize,
) -> Result<&'a Function, ArgError> {
    let overloads = abi
        .function(name)
        .ok_or_else(|| ArgError::UnknownMethod(name.to_string()))?;

    overloads
        .iter()
        .find(|f| f.inputs.len() == argc)
        .ok_or_else(|| {
            let mut arities: Vec<usize> = overloads.iter().map(|f| f.inputs.len()).collect();
            arities.sort_unstable();
            arities.dedup();
            let expected: Vec<String> = arities.iter().map(|n| n.to_string()).collect();
            ArgError::ArityMismatch {
                method: name.to_string(),
                expected: expected.join(" or "),
                given: argc,
            }
        })
}

/// Coerce each string in `args` into the type of the matching parameter
pub fn coerce_args(params: &[Param], args: &[String]) -> Result<Vec<DynSolValue>, ArgError> {
    params
        .iter()
        .zip(args)
        .enumerate()
        .map(|(index, (param, value))| {
            let ty: DynSolType = param.resolve().map_err(|e| ArgError::UnsupportedType {
                param_type: param.ty.clone(),
                reason: e.to_string(),
            })?;
            ty.coerce_str(value).map_err(|e| ArgError::InvalidArgument {
                index,
                param_type: param.ty.clone(),
                value: value.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Selector-prefixed calldata for `function` with `args`
pub fn encode_call(function: &Function, args: &[String]) -> Result<Vec<u8>, ArgError> {
    let values = coerce_args(&function.inputs, args)?;
    function
        .abi_encode_input(&values)
        .map_err(|e| ArgError::Encode {
            method: function.name.clone(),
            reason: e.to_string(),
        })
}

/// ABI-encoded constructor arguments, to append to creation bytecode.
///
/// A contract without a constructor accepts only an empty argument list.
pub fn encode_constructor(abi: &JsonAbi, args: &[String]) -> Result<Vec<u8>, ArgError> {
    let Some(constructor) = abi.constructor() else {
        if args.is_empty() {
            return Ok(Vec::new());
        }
        return Err(ArgError::ArityMismatch {
            method: "constructor".into(),
            expected: "0".into(),
            given: args.len(),
        });
    };

    if constructor.inputs.len() != args.len() {
        return Err(ArgError::ArityMismatch {
            method: "constructor".into(),
            expected: constructor.inputs.len().to_string(),
            given: args.len(),
        });
    }

    let values = coerce_args(&constructor.inputs, args)?;
    constructor
        .abi_encode_input(&values)
        .map_err(|e| ArgError::Encode {
            method: "constructor".into(),
            reason: e.to_string(),
        })
}

/// Decode `data` returned by a call to `function`
pub fn decode_output(function: &Function, data: &[u8]) -> Result<Vec<DynSolValue>, ArgError> {
    function
        .abi_decode_output(data)
        .map_err(|e| ArgError::Decode {
            method: function.name.clone(),
            reason: e.to_string(),
        })
}

/// Human-readable rendering of a decoded value
pub fn format_value(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::FixedBytes(word, size) => hex::encode_prefixed(&word[..*size]),
        DynSolValue::Address(address) => address.to_checksum(None),
        DynSolValue::Function(f) => hex::encode_prefixed(f.as_slice()),
        DynSolValue::Bytes(bytes) => hex::encode_prefixed(bytes),
        DynSolValue::String(s) => s.clone(),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) => {
            format!("[{}]", join_values(items))
        }
        DynSolValue::Tuple(items) => format!("({})", join_values(items)),
        #[allow(unreachable_patterns)]
        other => format!("{:?}", other),
    }
}

fn join_values(items: &[DynSolValue]) -> String {
    items.iter().map(format_value).collect::<Vec<_>>().join(", ")
}
