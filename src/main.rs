use std::fs;

use clap::Parser;
use formulary::interpreter::{environment::Environment, value::RuntimeValue};

/// formulary resolves formula strings: arithmetic, conditionals, dice
/// notation and unit-aware quantities, against a set of variable bindings.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Tells formulary to read the formula from a file instead.
    #[arg(short, long)]
    file: bool,

    /// Binds a variable before resolving, as `name=value`. Numeric values
    /// bind as numbers, everything else as text. May repeat.
    #[arg(short, long = "bind", value_name = "NAME=VALUE")]
    bind: Vec<String>,

    contents: String,
}

fn main() {
    let args = Args::parse();

    let formula = if args.file {
        fs::read_to_string(&args.contents).unwrap_or_else(|_| {
            eprintln!("Failed to read the input file '{}'. Perhaps this file does not exist?",
                      &args.contents);
            std::process::exit(1);
        })
    } else {
        args.contents
    };

    let mut environment = Environment::new("cli");
    for binding in &args.bind {
        let Some((name, value)) = binding.split_once('=') else {
            eprintln!("Invalid binding '{binding}'; expected name=value.");
            std::process::exit(1);
        };

        let value = value.parse::<f64>()
                         .map(RuntimeValue::Number)
                         .unwrap_or_else(|_| RuntimeValue::Text(value.to_string()));

        if let Err(e) = environment.assign_value(name, value) {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }

    match formulary::resolve_expression(&formula, &mut environment) {
        Ok(resolution) => {
            println!("{}", resolution.content);
            if !resolution.is_resolved() {
                eprintln!("(unresolved; bind the missing names and resolve again)");
            }
        },
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        },
    }
}
