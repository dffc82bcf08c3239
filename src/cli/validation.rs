use crate::cli::args::CliArgs;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(endpoint) = args.endpoint.as_deref() {
        if reqwest::Url::parse(endpoint).is_err() {
            return Err(format!("invalid --endpoint '{endpoint}'"));
        }
    }
    if let Some(page) = args.page {
        if page == 0 {
            return Err("invalid --page, pages are numbered from 1".to_string());
        }
    }
    if let Some(rate) = args.rate {
        if rate == 0 {
            return Err("invalid --rate, expected positive requests per second".to_string());
        }
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid --timeout, expected positive seconds".to_string());
        }
    }
    if let Some(raw) = args.output_format.as_deref() {
        if crate::output::OutputFormat::parse(raw).is_none() {
            return Err(format!("invalid --fmt '{raw}', expected text or json"));
        }
    }
    Ok(())
}
