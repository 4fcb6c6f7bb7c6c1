//! Status tokens: classify job outcomes and look them up by name or code.
//!
//! Run with: `cargo run --example status_tokens`

use bevy_token::{includes, token_hierarchy, Registry, TokenClassDef, TokenError};

token_hierarchy! {
    pub mod StatusTokens {
        #[root(int_index)]
        Status {
            Success {
                COMPLETED = 0;
                PAUSED = 1;
            }
            Error {
                #[float = 0.5]
                MECHANICAL_ERROR = 10;
                USER_ERROR = 11;
            }
        }
    }
}

use StatusTokens::Status;

fn main() -> Result<(), TokenError> {
    let mut registry = Registry::from_definitions(StatusTokens::DEFINITIONS)?;

    println!("=== Status Tokens Demo ===\n");

    // Enumerate in construction order
    println!("Classes under Status: {:?}", registry.subclass_names(Status::Class));
    for token in registry.tokens(Status::Class) {
        println!("  {token:?}");
    }

    // Decode a stored exit code
    let code = 11;
    let outcome = registry.lookup_by_int(Status::Class, code)?;
    println!("\nexit code {code} -> {outcome}");

    if includes(Status::Error::Class, outcome) {
        println!("  job failed ({})", outcome.type_name());
    }
    if *outcome == Status::Error::USER_ERROR {
        println!("  blame the input");
    }

    // Unknown names are recoverable
    match registry.try_lookup_by_string(Status::Class, "RETRYING")? {
        Some(token) => println!("\nfound {token}"),
        None => println!("\nno RETRYING status"),
    }

    // Tokens can be added at runtime, under the same uniqueness rules
    let success = Status::Success::Class::token_class();
    let resumed = registry.construct(&success, ("RESUMED", 2))?;
    println!("registered {resumed:?}");

    if let Err(err) = registry.construct(&success, ("REPLAYED", 0)) {
        println!("rejected: {err}");
    }

    Ok(())
}
