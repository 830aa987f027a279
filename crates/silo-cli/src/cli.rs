use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "silo",
    about = "Silo — embedded flat-file key/value store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Root data directory (overrides config and default).
    #[arg(long, global = true)]
    pub dir: Option<String>,

    /// Database name.
    #[arg(long, global = true)]
    pub db: Option<String>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Store a value under a key
    Set(SetArgs),
    /// Fetch the value stored under a key
    Get(GetArgs),
    /// Fetch several keys at once
    Mget(MgetArgs),
    /// Delete a key
    Del(DelArgs),
    /// Delete several keys at once
    Mdel(MdelArgs),
    /// List keys, optionally filtered by a wildcard pattern
    Keys(KeysArgs),
    /// Check whether a key exists
    Exists(ExistsArgs),
    /// Search record values by wildcard or field match
    Find(FindArgs),
    /// Increment an integer key
    Incr(IncrArgs),
    /// Decrement an integer key
    Decr(DecrArgs),
    /// Set or clear a key's expiry
    Expire(ExpireArgs),
    /// Append to an existing value
    Append(AppendArgs),
    /// Delete every key in the database
    Flushdb(FlushdbArgs),
    /// Show engine name, version, and options
    Info(InfoArgs),
}

#[derive(Args)]
pub struct SetArgs {
    pub key: String,
    /// The value; `file://` references are resolved from disk.
    pub value: String,
    /// Expire the key this many seconds from now.
    #[arg(long)]
    pub expiry: Option<u64>,
    /// Obfuscate the payload with this secret.
    #[arg(long)]
    pub encrypt: Option<String>,
    /// Extra metadata entries, `name=value`, repeatable.
    #[arg(long = "extra", value_name = "NAME=VALUE")]
    pub extra: Vec<String>,
}

#[derive(Args)]
pub struct GetArgs {
    pub key: String,
    /// Show the full record instead of the bare value.
    #[arg(long)]
    pub meta: bool,
    /// Decode a binary payload back to raw bytes.
    #[arg(long)]
    pub blob: bool,
    /// Deobfuscate the payload with this secret.
    #[arg(long)]
    pub decrypt: Option<String>,
    /// Write the value to stdout without any decoration.
    #[arg(long)]
    pub raw: bool,
}

#[derive(Args)]
pub struct MgetArgs {
    #[arg(required = true)]
    pub keys: Vec<String>,
}

#[derive(Args)]
pub struct DelArgs {
    pub key: String,
}

#[derive(Args)]
pub struct MdelArgs {
    #[arg(required = true)]
    pub keys: Vec<String>,
}

#[derive(Args)]
pub struct KeysArgs {
    /// Wildcard pattern; all keys when omitted.
    pub pattern: Option<String>,
    /// List full index entries instead of bare keys.
    #[arg(long)]
    pub meta: bool,
}

#[derive(Args)]
pub struct ExistsArgs {
    pub key: String,
}

#[derive(Args)]
pub struct FindArgs {
    /// Key to search, or `*` for every key.
    pub key: String,
    /// Value pattern to look for.
    pub value: String,
    /// Restrict the match to fields whose name matches this pattern.
    #[arg(long)]
    pub field: Option<String>,
}

#[derive(Args)]
pub struct IncrArgs {
    pub key: String,
    pub amount: Option<i64>,
}

#[derive(Args)]
pub struct DecrArgs {
    pub key: String,
    pub amount: Option<i64>,
}

#[derive(Args)]
pub struct ExpireArgs {
    pub key: String,
    /// Seconds from now; 0 or negative clears the expiry.
    pub seconds: i64,
}

#[derive(Args)]
pub struct AppendArgs {
    pub key: String,
    pub value: String,
}

#[derive(Args)]
pub struct FlushdbArgs {}

#[derive(Args)]
pub struct InfoArgs {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_set() {
        let cli = Cli::try_parse_from(["silo", "set", "greeting", "hello"]).unwrap();
        if let Command::Set(args) = cli.command {
            assert_eq!(args.key, "greeting");
            assert_eq!(args.value, "hello");
            assert_eq!(args.expiry, None);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_set_with_expiry_and_extra() {
        let cli = Cli::try_parse_from([
            "silo", "set", "k", "v", "--expiry", "60", "--extra", "mime=text/plain",
        ])
        .unwrap();
        if let Command::Set(args) = cli.command {
            assert_eq!(args.expiry, Some(60));
            assert_eq!(args.extra, vec!["mime=text/plain"]);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_set_encrypt() {
        let cli = Cli::try_parse_from(["silo", "set", "k", "v", "--encrypt", "s3cret"]).unwrap();
        if let Command::Set(args) = cli.command {
            assert_eq!(args.encrypt, Some("s3cret".into()));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_get_flags() {
        let cli =
            Cli::try_parse_from(["silo", "get", "k", "--meta", "--blob", "--decrypt", "s"]).unwrap();
        if let Command::Get(args) = cli.command {
            assert!(args.meta);
            assert!(args.blob);
            assert_eq!(args.decrypt, Some("s".into()));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_mget_requires_keys() {
        assert!(Cli::try_parse_from(["silo", "mget"]).is_err());
        let cli = Cli::try_parse_from(["silo", "mget", "a", "b"]).unwrap();
        if let Command::Mget(args) = cli.command {
            assert_eq!(args.keys, vec!["a", "b"]);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_keys_pattern() {
        let cli = Cli::try_parse_from(["silo", "keys", "user:*", "--meta"]).unwrap();
        if let Command::Keys(args) = cli.command {
            assert_eq!(args.pattern, Some("user:*".into()));
            assert!(args.meta);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_find_with_field() {
        let cli = Cli::try_parse_from(["silo", "find", "*", "val*", "--field", "status"]).unwrap();
        if let Command::Find(args) = cli.command {
            assert_eq!(args.key, "*");
            assert_eq!(args.value, "val*");
            assert_eq!(args.field, Some("status".into()));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_incr_amount() {
        let cli = Cli::try_parse_from(["silo", "incr", "c", "10"]).unwrap();
        if let Command::Incr(args) = cli.command {
            assert_eq!(args.amount, Some(10));
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_expire_negative_seconds() {
        let cli = Cli::try_parse_from(["silo", "expire", "k", "--", "-1"]).unwrap();
        if let Command::Expire(args) = cli.command {
            assert_eq!(args.seconds, -1);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_global_options() {
        let cli = Cli::try_parse_from([
            "silo", "--dir", "/data", "--db", "cache", "--format", "json", "info",
        ])
        .unwrap();
        assert_eq!(cli.dir, Some("/data".into()));
        assert_eq!(cli.db, Some("cache".into()));
        assert!(matches!(cli.format, OutputFormat::Json));
    }

    #[test]
    fn parse_flushdb() {
        let cli = Cli::try_parse_from(["silo", "flushdb"]).unwrap();
        assert!(matches!(cli.command, Command::Flushdb(_)));
    }
}
