use std::collections::BTreeMap;
use std::io::Write;

use colored::Colorize;
use serde_json::Value as Json;

use silo_store::{Fetched, Found, MatchSpec, Options, Silo, StoreError};
use silo_types::Value;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let silo = open_store(&cli)?;
    let json = matches!(cli.format, OutputFormat::Json);
    match cli.command {
        Command::Set(args) => cmd_set(&silo, args, json),
        Command::Get(args) => cmd_get(&silo, args, json),
        Command::Mget(args) => cmd_mget(&silo, args, json),
        Command::Del(args) => cmd_del(&silo, args),
        Command::Mdel(args) => cmd_mdel(&silo, args),
        Command::Keys(args) => cmd_keys(&silo, args, json),
        Command::Exists(args) => cmd_exists(&silo, args),
        Command::Find(args) => cmd_find(&silo, args, json),
        Command::Incr(args) => cmd_step(&silo, &args.key, args.amount, true),
        Command::Decr(args) => cmd_step(&silo, &args.key, args.amount, false),
        Command::Expire(args) => cmd_expire(&silo, args),
        Command::Append(args) => cmd_append(&silo, args),
        Command::Flushdb(_) => cmd_flushdb(&silo),
        Command::Info(_) => cmd_info(&silo, json),
    }
}

fn open_store(cli: &Cli) -> anyhow::Result<Silo> {
    let mut options = Options::load_env();
    if let Some(dir) = &cli.dir {
        options.dir = dir.into();
    }
    if let Some(db) = &cli.db {
        options.dbname = db.clone();
    }
    Ok(Silo::new(options)?)
}

fn cmd_set(silo: &Silo, args: SetArgs, json: bool) -> anyhow::Result<()> {
    let mut request = silo.request().extra(parse_extra(&args.extra)?);
    if let Some(seconds) = args.expiry {
        request = request.expiry(seconds);
    }
    if let Some(secret) = args.encrypt {
        request = request.encrypt(secret);
    }
    match request.set(&args.key, args.value) {
        Ok(key) if json => println!("{}", serde_json::json!({ "key": key })),
        Ok(key) => println!("{} {}", "✓".green().bold(), key.yellow()),
        Err(err) => report_failure(&args.key, &err)?,
    }
    Ok(())
}

fn cmd_get(silo: &Silo, args: GetArgs, json: bool) -> anyhow::Result<()> {
    let mut request = silo.request();
    if args.meta {
        request = request.meta();
    }
    if args.blob {
        request = request.blob();
    }
    if let Some(secret) = args.decrypt {
        request = request.decrypt(secret);
    }
    match request.get(&args.key) {
        Ok(Fetched::Record { record, value }) => {
            if json {
                let mut tree = serde_json::to_value(&record)?;
                tree["value"] = value_json(&value);
                println!("{}", serde_json::to_string_pretty(&tree)?);
            } else {
                println!("{}  {}", "key:".dimmed(), record.key.yellow());
                println!("{} {}", "type:".dimmed(), record.kind);
                println!("{} {}", "size:".dimmed(), record.size);
                println!("{} {}", "time:".dimmed(), record.timestamp);
                if record.expiry > 0 {
                    println!("{} {}", "expiry:".dimmed(), record.expiry);
                }
                for (name, meta) in &record.extra {
                    println!("{} {meta}", format!("{name}:").dimmed());
                }
                println!("{}", value_text(&value));
            }
        }
        Ok(fetched) => print_value(&fetched.into_value(), args.raw, json)?,
        Err(err) => report_failure(&args.key, &err)?,
    }
    Ok(())
}

fn cmd_mget(silo: &Silo, args: MgetArgs, json: bool) -> anyhow::Result<()> {
    let keys: Vec<&str> = args.keys.iter().map(String::as_str).collect();
    let results = silo.mget(&keys);
    if json {
        let tree: serde_json::Map<String, Json> = results
            .iter()
            .map(|(key, value)| {
                (key.clone(), value.as_ref().map(value_json).unwrap_or(Json::Null))
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&tree)?);
        return Ok(());
    }
    for (key, value) in &results {
        match value {
            Some(value) => println!("{} {}", format!("{key}:").yellow(), value_text(value)),
            None => println!("{} {}", format!("{key}:").yellow(), "(nil)".dimmed()),
        }
    }
    Ok(())
}

fn cmd_del(silo: &Silo, args: DelArgs) -> anyhow::Result<()> {
    match silo.delete(&args.key) {
        Ok(key) => println!("{} deleted {}", "✓".green().bold(), key.yellow()),
        Err(err) => report_failure(&args.key, &err)?,
    }
    Ok(())
}

fn cmd_mdel(silo: &Silo, args: MdelArgs) -> anyhow::Result<()> {
    let keys: Vec<&str> = args.keys.iter().map(String::as_str).collect();
    let deleted = silo.mdelete(&keys);
    println!("{} deleted {} of {}", "✓".green().bold(), deleted.len(), keys.len());
    for key in deleted {
        println!("  {}", key.yellow());
    }
    Ok(())
}

fn cmd_keys(silo: &Silo, args: KeysArgs, json: bool) -> anyhow::Result<()> {
    let pattern = args.pattern.unwrap_or_default();
    if args.meta {
        match silo.entries(&pattern) {
            Some(entries) if json => println!("{}", serde_json::to_string_pretty(&entries)?),
            Some(entries) => {
                for entry in entries {
                    println!(
                        "{}  {}  {}  {} bytes",
                        entry.key.yellow(),
                        entry.kind,
                        entry.timestamp,
                        entry.size
                    );
                }
            }
            None => println!("{}", "(empty)".dimmed()),
        }
        return Ok(());
    }
    match silo.keys(&pattern) {
        Some(keys) if json => println!("{}", serde_json::to_string_pretty(&keys)?),
        Some(keys) => {
            for key in keys {
                println!("{}", key.yellow());
            }
        }
        None => println!("{}", "(empty)".dimmed()),
    }
    Ok(())
}

fn cmd_exists(silo: &Silo, args: ExistsArgs) -> anyhow::Result<()> {
    if silo.exists(&args.key) {
        println!("{} {} exists", "✓".green().bold(), args.key.yellow());
    } else {
        println!("{} {} does not exist", "✗".red(), args.key.yellow());
    }
    Ok(())
}

fn cmd_find(silo: &Silo, args: FindArgs, json: bool) -> anyhow::Result<()> {
    let spec = match args.field {
        Some(name) => MatchSpec::Field {
            name,
            value: args.value,
        },
        None => MatchSpec::Value(args.value),
    };
    match silo.find(&args.key, &spec) {
        Some(Found::Many(found)) if json => println!("{}", serde_json::to_string_pretty(&found)?),
        Some(Found::Many(found)) => {
            if found.is_empty() {
                println!("{}", "(no matches)".dimmed());
            }
            for (key, tree) in found {
                println!("{} {tree}", format!("{key}:").yellow());
            }
        }
        Some(Found::One(tree)) if json => println!("{}", serde_json::to_string_pretty(&tree)?),
        Some(Found::One(tree)) => println!("{tree}"),
        None => println!("{}", "(no matches)".dimmed()),
    }
    Ok(())
}

fn cmd_step(silo: &Silo, key: &str, amount: Option<i64>, up: bool) -> anyhow::Result<()> {
    let result = match (up, amount) {
        (true, Some(n)) => silo.incr_by(key, n),
        (true, None) => silo.incr(key),
        (false, Some(n)) => silo.decr_by(key, n),
        (false, None) => silo.decr(key),
    };
    match result {
        Ok(n) => println!("{n}"),
        Err(err) => report_failure(key, &err)?,
    }
    Ok(())
}

fn cmd_expire(silo: &Silo, args: ExpireArgs) -> anyhow::Result<()> {
    match silo.expire(&args.key, args.seconds) {
        Ok(update) if update.expiry == 0 => {
            println!("{} {} never expires", "✓".green().bold(), update.key.yellow());
        }
        Ok(update) => println!(
            "{} {} expires at {}",
            "✓".green().bold(),
            update.key.yellow(),
            update.expiry
        ),
        Err(err) => report_failure(&args.key, &err)?,
    }
    Ok(())
}

fn cmd_append(silo: &Silo, args: AppendArgs) -> anyhow::Result<()> {
    match silo.append(&args.key, args.value) {
        Ok(key) => println!("{} appended to {}", "✓".green().bold(), key.yellow()),
        Err(err) => report_failure(&args.key, &err)?,
    }
    Ok(())
}

fn cmd_flushdb(silo: &Silo) -> anyhow::Result<()> {
    let count = silo.flush();
    println!("{} flushed {} keys", "✓".green().bold(), count);
    Ok(())
}

fn cmd_info(silo: &Silo, json: bool) -> anyhow::Result<()> {
    let info = silo.info();
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }
    println!("{} v{}", info.name.bold(), info.version);
    println!("  dir: {}", info.options.dir.display());
    println!("  db: {}", info.options.dbname.yellow());
    println!("  key length: {}", info.options.key_length);
    println!("  default ttl: {}", info.options.key_expiry);
    println!("  blob cap: {} bytes", info.options.blob_size);
    Ok(())
}

/// Expected negative outcomes print as status lines; real faults bubble up.
fn report_failure(key: &str, err: &StoreError) -> anyhow::Result<()> {
    match err {
        StoreError::Io(io) => Err(anyhow::anyhow!("i/o failure on {key}: {io}")),
        other => {
            println!("{} {}", "✗".red(), other);
            Ok(())
        }
    }
}

fn print_value(value: &Value, raw: bool, json: bool) -> anyhow::Result<()> {
    if raw {
        let mut out = std::io::stdout();
        match value {
            Value::Bytes(bytes) => out.write_all(bytes)?,
            other => out.write_all(value_text(other).as_bytes())?,
        }
        return Ok(());
    }
    if json {
        println!("{}", serde_json::to_string_pretty(&value_json(value))?);
    } else {
        println!("{}", value_text(value));
    }
    Ok(())
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Str(s) | Value::Json(s) => s.clone(),
        Value::Int(n) => n.to_string(),
        Value::Structured(tree) => tree.to_string(),
        Value::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        Value::Rejected => String::new(),
    }
}

fn value_json(value: &Value) -> Json {
    match value {
        Value::Str(s) => Json::String(s.clone()),
        Value::Json(s) => serde_json::from_str(s).unwrap_or_else(|_| Json::String(s.clone())),
        Value::Int(n) => Json::from(*n),
        Value::Structured(tree) => tree.clone(),
        Value::Bytes(bytes) => Json::String(String::from_utf8_lossy(bytes).into_owned()),
        Value::Rejected => Json::Null,
    }
}

fn parse_extra(items: &[String]) -> anyhow::Result<BTreeMap<String, Json>> {
    items
        .iter()
        .map(|item| {
            let (name, value) = item
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("extra metadata must be NAME=VALUE: {item}"))?;
            Ok((name.to_string(), Json::String(value.to_string())))
        })
        .collect()
}
