use grain::config::Config;
use grain::error::Result;
use grain::loader::SourceFilter;
use grain::pipeline::{self, QueryRequest};
use grain::session::Session;

use super::{print_response, runtime};

pub fn cmd_ask(config: Config, query: &str, source: SourceFilter, verbose: bool) -> Result<()> {
    let mut session = Session::open(config)?;
    session.set_source_filter(source);
    let request = QueryRequest::for_session(&session, query);

    let rt = runtime()?;
    let response = rt.block_on(pipeline::answer(&mut session, &request))?;
    print_response(&response, verbose);
    Ok(())
}
