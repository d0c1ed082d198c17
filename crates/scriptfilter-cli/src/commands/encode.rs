//! Demo workflow: URL-form-encode the query.
//!
//! Runs through the same pipeline a real workflow binary uses, so it doubles as
//! a smoke test for dependency bootstrap and the response cache.

use futures::FutureExt;
use scriptfilter_core::{
    BuiltinIcon, Config, Error, HandlerFuture, Invocation, ResultItem, Runner, WorkflowClient,
};
use std::process::ExitCode;

pub fn run(config: Config, query: String, cache: bool) -> ExitCode {
    let config = if cache { config.with_cache(true) } else { config };
    let invocation = Invocation::from_args(["scriptfilter".to_string(), query]);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    Runner::new(config, invocation).run(encode, &mut out).exit_code()
}

fn encode(client: &mut WorkflowClient) -> HandlerFuture<'_> {
    async move {
        if client.query().is_empty() {
            client.add_result(
                ResultItem::new("Type something to encode")?
                    .with_valid(false)
                    .with_icon(BuiltinIcon::Info),
            );
            return Ok(());
        }

        if client.load_cached_response() {
            return Ok(());
        }

        let encoded = form_encode(client.query());
        client.log(format!("encoded {:?} as {encoded:?}", client.query()));
        client.add_result(
            ResultItem::new("Encoded")?
                .with_subtitle(encoded.clone())
                .with_uid("encoded")
                .with_arg(encoded),
        );

        if client.cache_enabled() {
            client.cache_response()?;
        }
        Ok::<(), Error>(())
    }
    .boxed_local()
}

fn form_encode(text: &str) -> String {
    url::form_urlencoded::byte_serialize(text.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_encode() {
        assert_eq!(form_encode("Hello World"), "Hello+World");
        assert_eq!(form_encode("a&b=c"), "a%26b%3Dc");
        assert_eq!(form_encode("ünï"), "%C3%BCn%C3%AF");
    }
}
