use anyhow::Result;

use crate::cli::DocsArgs;
use crate::corpus::Corpus;

pub fn run(args: DocsArgs) -> Result<()> {
    let documents = Corpus::new(&args.paths.data_root).load_all()?;

    for (index, document) in documents.iter().enumerate() {
        let languages = document
            .professional_translations
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>();
        println!(
            "{index}: {} ({} translations) [{}]",
            document.doc_id,
            languages.len(),
            languages.join(", ")
        );
    }

    Ok(())
}
