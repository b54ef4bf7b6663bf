use tracing_subscriber::EnvFilter;

pub fn default_level(verbose: bool, production: bool) -> &'static str {
    if verbose {
        "debug"
    } else if production {
        "warn"
    } else {
        "info"
    }
}

/// Installs the stderr subscriber. `RUST_LOG` takes precedence over the flags.
pub fn init(verbose: bool, production: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose, production)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level() {
        assert_eq!(default_level(true, true), "debug");
        assert_eq!(default_level(false, true), "warn");
        assert_eq!(default_level(false, false), "info");
    }
}
