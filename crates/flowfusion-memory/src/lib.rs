pub mod embeddings;
pub mod store;

use std::sync::Arc;

use tracing::info;

use flowfusion_core::config::AppConfig;
use flowfusion_core::error::Result;
use flowfusion_core::types::Document;

pub use embeddings::{cosine_similarity, EmbeddingProvider, HttpEmbeddingProvider};
pub use store::KnowledgeBase;

/// Build the process-wide knowledge base described by `config`.
///
/// Seeds the sample corpus into an empty store when `seed_defaults` is set,
/// adds configured documents, and indexes embeddings when a provider is configured.
pub async fn load_knowledge_base(config: &AppConfig) -> Result<KnowledgeBase> {
    let kb_config = &config.knowledge_base;
    let mut kb = match kb_config.resolved_path() {
        Some(path) => KnowledgeBase::open(&path)?,
        None => KnowledgeBase::in_memory()?,
    };

    if let Some(ref embedding) = config.embedding {
        kb = kb.with_embedder(Arc::new(HttpEmbeddingProvider::from_config(embedding)));
    }

    if kb_config.seed_defaults && kb.is_empty()? {
        let seeded = kb.add_documents(&Document::default_corpus())?;
        info!(documents = seeded, "Seeded default knowledge base corpus");
    }

    if !kb_config.documents.is_empty() {
        let added = kb.add_documents(&kb_config.documents)?;
        info!(documents = added, "Loaded configured knowledge base documents");
    }

    if kb.has_embedder() {
        let indexed = kb.index_embeddings().await?;
        info!(documents = indexed, "Indexed knowledge base embeddings");
    }

    Ok(kb)
}
