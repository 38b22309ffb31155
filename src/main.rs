use clap::{Parser, Subcommand};
use proposal_formula::{Context, CustomVariable, EvalOptions, Evaluator};
use serde_json::{json, Value};
use tracing::Level;

/// Evaluate proposal template formulas from the command line.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    cmd: Command,
    /// Log debug details to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
    /// Maximum expression length in characters
    #[arg(long, global = true)]
    max_length: Option<usize>,
    /// Maximum nesting depth of parentheses and unary minus
    #[arg(long, global = true)]
    max_depth: Option<usize>,
    /// Disable the length and depth guards
    #[arg(long, global = true, conflicts_with_all = ["max_length", "max_depth"])]
    unbounded: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute an expression; prints {"result": number|null}
    Eval {
        expression: String,
        /// Variable values as a JSON object
        #[arg(long)]
        vars: Option<String>,
        /// A single variable, `name=value`; repeatable, wins over --vars
        #[arg(long = "var", value_parser = parse_var)]
        var: Vec<(String, f64)>,
    },
    /// Check the grammar of an expression; exits 1 when invalid
    Validate { expression: String },
    /// List the variables an expression references
    Vars { expression: String },
    /// Evaluate a JSON array of {"name", "expression"} custom variables
    Batch {
        /// Path to the JSON file
        file: String,
        /// Variable values as a JSON object
        #[arg(long)]
        vars: Option<String>,
    },
}

fn parse_var(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{s}`"))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    Ok((name.trim().to_string(), value))
}

fn main() {
    // Parse CLI arguments.
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    // Build options.
    let mut opts = EvalOptions::default();
    if args.unbounded {
        opts = EvalOptions::unbounded();
    }
    if args.max_length.is_some() {
        opts.max_length = args.max_length;
    }
    if args.max_depth.is_some() {
        opts.max_depth = args.max_depth;
    }
    let ev = Evaluator::new().with_options(opts);

    let (out, code) = match run(&ev, args.cmd) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    };

    // Output result.
    match serde_json::to_string_pretty(&out) {
        Ok(s) => println!("{s}"),
        Err(e) => {
            eprintln!("cannot render output: {e}");
            std::process::exit(2);
        }
    }
    std::process::exit(code);
}

fn run(ev: &Evaluator, cmd: Command) -> Result<(Value, i32), String> {
    match cmd {
        Command::Eval {
            expression,
            vars,
            var,
        } => {
            let mut ctx = load_context(vars.as_deref())?;
            for (name, value) in var {
                ctx.insert(name, value);
            }
            Ok((json!({ "result": ev.evaluate(&expression, &ctx) }), 0))
        }
        Command::Validate { expression } => {
            let res = ev.validate_expression(&expression);
            let code = if res.valid { 0 } else { 1 };
            let out = serde_json::to_value(&res).map_err(|e| e.to_string())?;
            Ok((out, code))
        }
        Command::Vars { expression } => Ok((json!(ev.extract_variables(&expression)), 0)),
        Command::Batch { file, vars } => {
            let ctx = load_context(vars.as_deref())?;
            let text =
                std::fs::read_to_string(&file).map_err(|e| format!("cannot read {file}: {e}"))?;
            let defs: Vec<CustomVariable> =
                serde_json::from_str(&text).map_err(|e| format!("invalid {file}: {e}"))?;
            let out = serde_json::to_value(ev.evaluate_all(&defs, &ctx))
                .map_err(|e| e.to_string())?;
            Ok((out, 0))
        }
    }
}

fn load_context(vars: Option<&str>) -> Result<Context, String> {
    match vars {
        Some(json) => Context::from_json(json).map_err(|e| e.to_string()),
        None => Ok(Context::new()),
    }
}
