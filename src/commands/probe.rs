use anyhow::{Result, bail};
use tracing::{error, info};

use crate::cli::ProbeArgs;
use crate::commands::{engine_settings, scorer_registry};
use crate::config::{ApiSettings, resolve_languages, resolve_models};
use crate::corpus::Corpus;
use crate::engine::Engine;
use crate::model::MetricField;
use crate::queue::WorkItem;
use crate::scoring::ScorerRegistry;
use crate::translate::{ChatTranslator, ThreadPacer};
use crate::util::excerpt;

pub fn run(args: ProbeArgs) -> Result<()> {
    let model = resolve_models(std::slice::from_ref(&args.model))?.remove(0);
    let language = resolve_languages(std::slice::from_ref(&args.language))?.remove(0);

    let documents = Corpus::new(&args.paths.data_root).load_all()?;
    let Some(document) = documents.get(args.doc) else {
        bail!(
            "document index {} out of range (corpus has {} documents)",
            args.doc,
            documents.len()
        );
    };

    let api = ApiSettings::from_env()?;
    let translator = ChatTranslator::new(&api)?;
    let scorer = if args.score {
        scorer_registry(&args.scorer)?
    } else {
        ScorerRegistry::native_only()
    };
    let pacer = ThreadPacer;
    let engine = Engine::new(&translator, &scorer, &pacer, engine_settings(&args.pacing));

    let item = WorkItem::new(&document.doc_id, &model, &language);
    info!(item = %item.key(), "probing single item");
    let outcome = engine.evaluate(document, &item, args.score);
    let record = &outcome.record;

    if !record.success {
        error!(
            item = %item.key(),
            error = %record.error_message.as_deref().unwrap_or("unknown"),
            "probe failed"
        );
        bail!("probe of {} failed", item.key());
    }

    let width = args.excerpt_chars;
    println!("--- ORIGINAL (english) ---\n{}\n", excerpt(&record.english_original, width));
    println!("--- LLM TRANSLATION ({language}) ---\n{}\n", excerpt(&record.llm_translation, width));
    println!(
        "--- PROFESSIONAL TRANSLATION ({language}) ---\n{}\n",
        excerpt(&record.professional_translation, width)
    );
    println!("--- LLM BACK-TRANSLATION ---\n{}\n", excerpt(&record.llm_back_translation, width));
    if !record.professional_back_translation.is_empty() {
        println!(
            "--- PROFESSIONAL BACK-TRANSLATION ---\n{}\n",
            excerpt(&record.professional_back_translation, width)
        );
    }
    println!(
        "timings: translation {:.2}s, back-translation {:.2}s, professional back-translation {:.2}s",
        record.translation_time, record.back_translation_time, record.professional_back_translation_time
    );

    if let Some(metrics) = &outcome.metrics {
        println!("\n--- METRICS ---");
        for field in MetricField::ALL {
            match metrics.scores.get(field) {
                Some(value) => println!("{:<34} {value:>8.3}", field.as_str()),
                None => println!("{:<34} {:>8}", field.as_str(), "N/A"),
            }
        }
    }

    Ok(())
}
