use crate::cli::args::CliArgs;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if args.page_size == Some(0) {
        return Err("invalid page-size, expected positive integer".to_string());
    }
    if args.pages == Some(0) {
        return Err("invalid pages, expected positive integer".to_string());
    }
    if args.timeout == Some(0) {
        return Err("invalid timeout, expected positive integer".to_string());
    }
    if let Some(raw) = args.output_format.as_deref() {
        if crate::output::OutputFormat::parse(raw).is_none() {
            return Err(format!(
                "invalid --output-format '{raw}', expected text, json or html"
            ));
        }
    }
    for (flag, raw) in [
        ("--catalog-url", args.catalog_url.as_deref()),
        ("--sprite-url", args.sprite_url.as_deref()),
    ] {
        if let Some(raw) = raw {
            reqwest::Url::parse(raw).map_err(|e| format!("invalid {flag} '{raw}': {e}"))?;
        }
    }
    Ok(())
}
