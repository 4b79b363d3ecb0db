//! Contract method invocation
//!
//! Mutating calls are signed transactions that need an explicit chain id;
//! view calls are `eth_call`s whose return data is decoded through the ABI.

pub mod args;
pub mod invoker;

pub use args::{coerce_args, encode_constructor, format_value, resolve_function, ArgError};
pub use invoker::{ContractInvoker, InvokeError, TransactionHandle};
