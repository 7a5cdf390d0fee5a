use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use tracing::{info, info_span, warn};

use wws_cli::output::{OutputFormat, write_table};
use wws_cli::progress::PageProgress;
use wws_extract::{ColumnPlan, Directive, DirectiveKind, extract_rows, parse_directive};
use wws_ingest::{
    HttpFetcher, build_envelope, expand_inputs, fetch_all_pages, read_documents, write_json_dumps,
    write_pages,
};
use wws_model::{ExtractJob, Namespace, load_job};

use crate::cli::{DumpArgs, ExtractArgs, FetchArgs, JobArgs, NamespaceArgs, OutputFormatArg};
use crate::types::{ExtractResult, FetchResult, TagOutcome, TagReport};

pub fn run_extract(args: &ExtractArgs) -> Result<ExtractResult> {
    let job = resolve_job(&args.job)?;
    job.validate().context("invalid extraction job")?;
    let span = info_span!("extract", start_tag = %job.start_tag);
    let _guard = span.enter();

    let inputs = expand_inputs(&args.responses).context("collect response files")?;
    let documents = read_documents(&inputs).context("read responses")?;
    info!(files = inputs.len(), "loaded responses");

    let started = Instant::now();
    let extracted = extract_rows(&documents, &job.start_tag, &job.tags, &job.options)
        .context("extract rows")?;
    info!(
        rows = extracted.rows.len(),
        columns = extracted.columns.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "extracted table"
    );

    let format = match args.format {
        OutputFormatArg::Csv => OutputFormat::Csv,
        OutputFormatArg::Json => OutputFormat::Json,
    };
    if let Some(path) = &args.output {
        write_table(&extracted, path, format, &args.list_separator)
            .with_context(|| format!("write {}", path.display()))?;
        info!(path = %path.display(), "saved table");
    }

    Ok(ExtractResult {
        start_tag: job.start_tag,
        inputs,
        extracted,
        output: args.output.clone(),
        format,
        preview: args.preview,
    })
}

/// Parses every tag expression without touching any response.
pub fn run_tags(args: &JobArgs) -> Result<Vec<TagReport>> {
    let job = resolve_job(args)?;
    if job.tags.is_empty() {
        bail!("no tag expressions given (use --tag or --job)");
    }

    let parsed: Vec<(String, Result<Directive, String>)> = job
        .tags
        .iter()
        .map(|tag| {
            let directive = parse_directive(tag, &job.options).map_err(|e| e.to_string());
            (tag.clone(), directive)
        })
        .collect();

    let raw_columns: Vec<String> = parsed
        .iter()
        .filter_map(|(_, directive)| directive.as_ref().ok())
        .flat_map(directive_columns)
        .collect();
    let plan = ColumnPlan::new(&raw_columns, &job.options.namespace);

    Ok(parsed
        .into_iter()
        .map(|(source, directive)| {
            let outcome = match directive {
                Ok(directive) => TagOutcome::Parsed {
                    kind: directive.kind_name(),
                    columns: directive_columns(&directive)
                        .into_iter()
                        .map(|raw| {
                            let name = plan.final_name(&raw).to_string();
                            (raw, name)
                        })
                        .collect(),
                },
                Err(message) => TagOutcome::Skipped(message),
            };
            TagReport { source, outcome }
        })
        .collect())
}

/// Raw columns a directive can write.
fn directive_columns(directive: &Directive) -> Vec<String> {
    match &directive.kind {
        DirectiveKind::RepeatAnchor(_) => Vec::new(),
        DirectiveKind::OrChain { target, .. } => {
            let mut columns = vec![target.clone()];
            columns.extend(directive.rename.clone());
            columns
        }
        _ => vec![directive.column().to_string()],
    }
}

pub fn run_fetch(args: &FetchArgs) -> Result<FetchResult> {
    let span = info_span!("fetch", url = %args.url);
    let _guard = span.enter();

    let body = std::fs::read_to_string(&args.body)
        .with_context(|| format!("read request body {}", args.body.display()))?;
    if !body.contains("{ page }") {
        warn!(
            path = %args.body.display(),
            "request body has no page placeholder; every page will repeat the same request"
        );
    }
    let template =
        build_envelope(&args.username, &args.password, &body).context("build SOAP envelope")?;
    let fetcher = match args.timeout {
        Some(secs) => HttpFetcher::with_timeout(&args.url, Duration::from_secs(secs)),
        None => HttpFetcher::new(&args.url),
    }
    .context("create HTTP client")?;
    let namespace = namespace_from(&args.namespace, Namespace::workday());

    let mut progress = if args.no_progress {
        PageProgress::hidden()
    } else {
        PageProgress::new()
    };
    let started = Instant::now();
    let pages = fetch_all_pages(
        &fetcher,
        &template,
        &namespace,
        args.concurrency,
        &mut progress,
    )
    .with_context(|| format!("fetch {}", args.url))?;
    progress.finish();
    info!(
        pages = pages.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "fetched all pages"
    );

    let written = write_pages(&args.out_dir, &pages).context("save pages")?;
    Ok(FetchResult {
        url: args.url.clone(),
        out_dir: args.out_dir.clone(),
        pages: written,
    })
}

pub fn run_dump(args: &DumpArgs) -> Result<Vec<std::path::PathBuf>> {
    let inputs = expand_inputs(&args.responses).context("collect response files")?;
    if inputs.is_empty() {
        bail!("no response files found");
    }
    let documents = read_documents(&inputs).context("read responses")?;
    write_json_dumps(&documents, &args.stem, args.max).context("write JSON dumps")
}

/// Loads the job file, if any, and applies flag overrides.
fn resolve_job(args: &JobArgs) -> Result<ExtractJob> {
    let mut job = match &args.job {
        Some(path) => load_job_file(path)?,
        None => ExtractJob::new(String::new(), Vec::new()),
    };
    if let Some(start_tag) = &args.start_tag {
        job.start_tag.clone_from(start_tag);
    }
    if !args.tags.is_empty() {
        job.tags.clone_from(&args.tags);
    }
    if args.allow_collections {
        job.options.allow_collections = true;
    }
    if let Some(max_key_length) = args.max_key_length {
        job.options.max_key_length = max_key_length;
    }
    if let Some(attribute) = &args.discriminator {
        job.options.discriminator_attribute.clone_from(attribute);
    }
    job.options.namespace = namespace_from(&args.namespace, job.options.namespace);
    Ok(job)
}

fn load_job_file(path: &Path) -> Result<ExtractJob> {
    load_job(path).with_context(|| format!("load job {}", path.display()))
}

fn namespace_from(args: &NamespaceArgs, base: Namespace) -> Namespace {
    Namespace {
        prefix: args.namespace_prefix.clone().unwrap_or(base.prefix),
        uri: args.namespace_uri.clone().unwrap_or(base.uri),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn job_args(tags: &[&str]) -> JobArgs {
        JobArgs {
            start_tag: Some("Journal_Entry_Data".to_string()),
            tags: tags.iter().map(ToString::to_string).collect(),
            ..JobArgs::default()
        }
    }

    #[test]
    fn flags_override_job_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("job.toml");
        std::fs::write(
            &path,
            r#"
            start_tag = "Worker"
            tags = ["Worker_ID"]

            [options]
            max_key_length = 40

            [options.namespace]
            prefix = "bsvc"
            uri = "urn:com.workday/bsvc"
            "#,
        )
        .expect("write job");

        let args = JobArgs {
            job: Some(path),
            tags: vec!["Legal_Name".to_string()],
            allow_collections: true,
            ..JobArgs::default()
        };
        let job = resolve_job(&args).expect("resolve");
        assert_eq!(job.start_tag, "Worker");
        assert_eq!(job.tags, vec!["Legal_Name"]);
        assert!(job.options.allow_collections);
        assert_eq!(job.options.max_key_length, 40);
        assert_eq!(job.options.namespace.prefix, "bsvc");
    }

    #[test]
    fn tags_report_final_names_and_errors() {
        let reports = run_tags(&job_args(&[
            "Journal_Number",
            "*Journal_Entry_Line_Data",
            "Memo^^Line_Memo",
            "Foo>>%cost?=colour%",
        ]))
        .expect("tags");
        assert_eq!(reports.len(), 4);

        let TagOutcome::Parsed { kind, columns } = &reports[0].outcome else {
            panic!("expected a parsed directive");
        };
        assert_eq!(*kind, "plain");
        assert_eq!(columns[0].1, "Journal_Number");

        let TagOutcome::Parsed { kind, columns } = &reports[1].outcome else {
            panic!("expected a parsed directive");
        };
        assert_eq!(*kind, "repeat-anchor");
        assert!(columns.is_empty());

        let TagOutcome::Parsed { columns, .. } = &reports[2].outcome else {
            panic!("expected a parsed directive");
        };
        assert_eq!(columns[0].1, "Line_Memo");

        assert!(matches!(reports[3].outcome, TagOutcome::Skipped(_)));
    }

    #[test]
    fn tags_require_expressions() {
        assert!(run_tags(&JobArgs::default()).is_err());
    }

    #[test]
    fn extract_writes_csv() {
        let dir = tempfile::tempdir().expect("tempdir");
        let page = dir.path().join("page_0001.xml");
        std::fs::write(
            &page,
            r#"<wd:Response xmlns:wd="urn:com.workday/bsvc">
  <wd:Journal_Entry_Data><wd:Journal_Number>J-1</wd:Journal_Number></wd:Journal_Entry_Data>
  <wd:Journal_Entry_Data><wd:Journal_Number>J-2</wd:Journal_Number></wd:Journal_Entry_Data>
</wd:Response>"#,
        )
        .expect("write page");
        let output = dir.path().join("out").join("journals.csv");

        let args = ExtractArgs {
            responses: vec![dir.path().to_path_buf()],
            job: job_args(&["Journal_Number"]),
            output: Some(output.clone()),
            format: OutputFormatArg::Csv,
            list_separator: "; ".to_string(),
            preview: 5,
        };
        let result = run_extract(&args).expect("extract");
        assert_eq!(result.inputs, vec![page]);
        assert_eq!(result.extracted.rows.len(), 2);
        let csv = std::fs::read_to_string(&output).expect("read csv");
        assert_eq!(csv, "Journal_Number\nJ-1\nJ-2\n");
    }

    #[test]
    fn extract_without_responses_fails() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = ExtractArgs {
            responses: vec![PathBuf::from(dir.path())],
            job: job_args(&["Journal_Number"]),
            output: None,
            format: OutputFormatArg::Json,
            list_separator: "; ".to_string(),
            preview: 5,
        };
        assert!(run_extract(&args).is_err());
    }
}
