use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use clap::{Parser, ValueEnum};
use ctc_error_rate::decoding::codec::load_codec;
use ctc_error_rate::decoding::ctc::{decode_hypotheses, decode_references};
use ctc_error_rate::{
    aggregate_reports, compute_utterance_report, CodecKind, ErrorRate, ErrorRateConfig, Meta,
    Report, TokenBatch, TokenCodec, TokenId, UtteranceReport,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Deserialize;

#[path = "error_rate_report/json_report_formatter.rs"]
mod json_report_formatter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CodecChoice {
    #[value(name = "sentencepiece")]
    SentencePiece,
    Char,
}

impl CodecChoice {
    fn codec_kind(self) -> CodecKind {
        match self {
            Self::SentencePiece => CodecKind::SentencePiece,
            Self::Char => CodecKind::Char,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "error_rate_report")]
#[command(about = "Score CTC token predictions against references (WER/CER)")]
struct Args {
    /// JSON array of cases with `id`, `prediction_ids`, `reference_ids`.
    #[arg(long, env = "ERROR_RATE_REPORT_CASES")]
    cases: PathBuf,
    #[arg(long, env = "ERROR_RATE_REPORT_VOCAB")]
    vocab: PathBuf,
    #[arg(
        long,
        env = "ERROR_RATE_REPORT_CODEC",
        value_enum,
        default_value_t = CodecChoice::SentencePiece
    )]
    codec: CodecChoice,
    /// Metric config JSON; flags below override it.
    #[arg(long, env = "ERROR_RATE_REPORT_CONFIG")]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = false)]
    cer: bool,
    #[arg(long, default_value_t = false)]
    no_fold: bool,
    #[arg(long, env = "ERROR_RATE_REPORT_BATCH_SIZE", default_value_t = 16)]
    batch_size: usize,
    /// Output path, `-` for stdout.
    #[arg(long, env = "ERROR_RATE_REPORT_OUT")]
    out: Option<PathBuf>,
    #[arg(long, env = "ERROR_RATE_REPORT_LIMIT")]
    limit: Option<usize>,
    #[arg(long, env = "ERROR_RATE_REPORT_OFFSET", default_value_t = 0)]
    offset: usize,
}

#[derive(Debug, Clone, Deserialize)]
struct Case {
    id: String,
    prediction_ids: Vec<TokenId>,
    #[serde(default)]
    prediction_length: Option<usize>,
    reference_ids: Vec<TokenId>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run() {
        tracing::error!(error = err.as_str(), "error_rate_report failed");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let args = Args::parse();
    if args.batch_size == 0 {
        return Err("--batch-size must be >= 1.".to_string());
    }

    let mut config = match args.config.as_ref() {
        Some(path) => ErrorRateConfig::load(path).map_err(|err| err.to_string())?,
        None => ErrorRateConfig::default(),
    };
    config.use_cer |= args.cer;
    if args.no_fold {
        config.fold_consecutive = false;
    }
    if config.batch_dim_index != 0 {
        tracing::warn!(
            batch_dim_index = config.batch_dim_index,
            "cases are stored batch-first; overriding batch_dim_index to 0"
        );
        config.batch_dim_index = 0;
    }

    let codec: Arc<dyn TokenCodec> = Arc::from(
        load_codec(&args.vocab, args.codec.codec_kind()).map_err(|err| err.to_string())?,
    );

    let mut cases = load_cases(&args.cases)?;
    if args.offset > 0 {
        cases = cases.into_iter().skip(args.offset).collect();
    }
    if let Some(limit) = args.limit {
        cases.truncate(limit);
    }
    if cases.is_empty() {
        return Err("No cases selected after applying offset/limit.".to_string());
    }

    let mut metric =
        ErrorRate::new(Arc::clone(&codec), config.clone()).map_err(|err| err.to_string())?;

    let progress = ProgressBar::new(cases.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta}) {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-"),
    );
    progress.set_message("starting...");

    let mut utterances = Vec::with_capacity(cases.len());
    for chunk in cases.chunks(args.batch_size) {
        if let Some(first) = chunk.first() {
            progress.set_message(first.id.clone());
        }
        utterances.extend(score_chunk(&mut metric, codec.as_ref(), &config, chunk)?);
        progress.inc(chunk.len() as u64);
    }
    progress.finish_with_message("scoring complete");

    let aggregates = aggregate_reports(&utterances);
    let report = Report {
        schema_version: ctc_error_rate::report::SCHEMA_VERSION,
        meta: Meta {
            generated_at: Utc::now().to_rfc3339(),
            vocab_path: args.vocab.to_string_lossy().into_owned(),
            codec: args.codec.codec_kind().as_str().to_string(),
            unit: metric.unit(),
            fold_consecutive: config.fold_consecutive,
            case_count: utterances.len(),
        },
        utterances,
        aggregates,
    };

    let computed = metric.compute();
    tracing::info!(
        rate = computed.rate,
        distance_sum = computed.distance_sum,
        reference_unit_count = computed.reference_unit_count,
        "error rate computed"
    );

    let out_path = resolve_out_path(args.out.as_ref());
    json_report_formatter::write_report(&out_path, &report)?;
    eprintln!("{}", json_report_formatter::summary_line(&report));
    if out_path != Path::new("-") {
        eprintln!("Report written to {}", out_path.display());
    }
    Ok(())
}

fn score_chunk(
    metric: &mut ErrorRate,
    codec: &dyn TokenCodec,
    config: &ErrorRateConfig,
    chunk: &[Case],
) -> Result<Vec<UtteranceReport>, String> {
    let blank_id = codec.blank_id();
    let prediction_rows: Vec<Vec<TokenId>> =
        chunk.iter().map(|case| case.prediction_ids.clone()).collect();
    let reference_rows: Vec<Vec<TokenId>> =
        chunk.iter().map(|case| case.reference_ids.clone()).collect();
    let prediction_lengths: Vec<usize> = chunk
        .iter()
        .map(|case| case.prediction_length.unwrap_or(case.prediction_ids.len()))
        .collect();
    let reference_lengths: Vec<usize> = chunk.iter().map(|case| case.reference_ids.len()).collect();

    let predictions = TokenBatch::padded(&prediction_rows, blank_id);
    let targets = TokenBatch::padded(&reference_rows, blank_id);

    let hypotheses = decode_hypotheses(
        codec,
        &predictions,
        Some(prediction_lengths.as_slice()),
        metric.batch_dim(),
        config.fold_consecutive,
    )
    .map_err(|err| format!("decode predictions near case '{}': {err}", chunk[0].id))?;
    let references = decode_references(codec, &targets, &reference_lengths)
        .map_err(|err| format!("decode references near case '{}': {err}", chunk[0].id))?;

    let texts: Vec<&str> = hypotheses.iter().map(|h| h.text.as_str()).collect();
    let score = metric
        .update_decoded(&texts, &references)
        .map_err(|err| err.to_string())?;

    chunk
        .iter()
        .zip(hypotheses.iter().zip(&references))
        .zip(score.pairs)
        .map(|((case, (hypothesis, reference)), pair)| {
            compute_utterance_report(&case.id, reference, hypothesis, pair, codec)
                .map_err(|err| format!("report for case '{}': {err}", case.id))
        })
        .collect()
}

fn load_cases(path: &Path) -> Result<Vec<Case>, String> {
    let data = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read cases file '{}': {err}", path.display()))?;
    serde_json::from_str(&data)
        .map_err(|err| format!("Failed to parse cases file '{}': {err}", path.display()))
}

fn resolve_out_path(out: Option<&PathBuf>) -> PathBuf {
    if let Some(path) = out {
        return path.clone();
    }

    let run_id = Utc::now().format("%Y%m%dT%H%M%SZ");
    PathBuf::from("target")
        .join("error_rate_reports")
        .join(format!("error-rate-report-{run_id}.json"))
}
