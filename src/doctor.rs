use std::path::Path;

use flowfusion_core::config::AppConfig;
use flowfusion_core::types::Document;
use flowfusion_llm::providers::presets::get_preset;
use flowfusion_memory::KnowledgeBase;

struct CheckResult {
    label: String,
    ok: bool,
    detail: String,
}

pub fn run_doctor(config: &AppConfig, config_path: Option<&Path>) {
    let checks = vec![
        check_config_file(config_path),
        check_api_key(config),
        check_knowledge_base(config),
        check_embeddings(config),
        check_engine(config),
    ];

    let mut ok_count = 0;
    let mut fail_count = 0;

    for check in &checks {
        let icon = if check.ok { "[OK]" } else { "[!!]" };
        println!("  {} {}: {}", icon, check.label, check.detail);
        if check.ok {
            ok_count += 1;
        } else {
            fail_count += 1;
        }
    }

    println!();
    println!("  {} passed, {} issues found", ok_count, fail_count);
}

fn check_config_file(path: Option<&Path>) -> CheckResult {
    match path {
        Some(p) => CheckResult {
            label: "Config".into(),
            ok: true,
            detail: format!("{}", p.display()),
        },
        None => CheckResult {
            label: "Config".into(),
            ok: true,
            detail: "No config file, using defaults".into(),
        },
    }
}

fn check_api_key(config: &AppConfig) -> CheckResult {
    let provider = &config.model.provider;
    let needs_key = get_preset(provider).map_or(true, |p| p.needs_api_key);
    let has_key = config.model.resolved_api_key().is_some();

    if !needs_key || has_key {
        CheckResult {
            label: "API Key".into(),
            ok: true,
            detail: format!("Configured for {} ({})", config.model.model_id, provider),
        }
    } else {
        CheckResult {
            label: "API Key".into(),
            ok: false,
            detail: format!(
                "No API key set for provider '{}'; runs will return an advisory",
                provider
            ),
        }
    }
}

/// Inspect the corpus without seeding it or contacting the embedding service.
fn check_knowledge_base(config: &AppConfig) -> CheckResult {
    let kb_config = &config.knowledge_base;
    let seeded = if kb_config.seed_defaults {
        Document::default_corpus().len()
    } else {
        0
    };

    let Some(path) = kb_config.resolved_path() else {
        return CheckResult {
            label: "Knowledge Base".into(),
            ok: seeded + kb_config.documents.len() > 0,
            detail: format!(
                "in-memory ({} seed + {} configured documents)",
                seeded,
                kb_config.documents.len()
            ),
        };
    };

    if !path.exists() {
        return CheckResult {
            label: "Knowledge Base".into(),
            ok: true,
            detail: format!("{} (created on first serve)", path.display()),
        };
    }

    match KnowledgeBase::open(&path).and_then(|kb| kb.len()) {
        Ok(0) => CheckResult {
            label: "Knowledge Base".into(),
            ok: false,
            detail: format!("{} (empty)", path.display()),
        },
        Ok(n) => CheckResult {
            label: "Knowledge Base".into(),
            ok: true,
            detail: format!("{} ({} documents)", path.display(), n),
        },
        Err(e) => CheckResult {
            label: "Knowledge Base".into(),
            ok: false,
            detail: format!("{}: {}", path.display(), e),
        },
    }
}

fn check_embeddings(config: &AppConfig) -> CheckResult {
    match &config.embedding {
        Some(emb) => CheckResult {
            label: "Embeddings".into(),
            ok: emb.dimensions > 0,
            detail: format!("{} via {} ({} dims)", emb.model, emb.provider, emb.dimensions),
        },
        None => CheckResult {
            label: "Embeddings".into(),
            ok: true,
            detail: "Not configured, using full-text ranking".into(),
        },
    }
}

fn check_engine(config: &AppConfig) -> CheckResult {
    let engine = &config.engine;
    let ok = engine.retrieval_top_k > 0
        && engine.retrieval_timeout_secs > 0
        && engine.generation_timeout_secs > 0;
    CheckResult {
        label: "Engine".into(),
        ok,
        detail: format!(
            "top_k={}, retrieval timeout {}s, generation timeout {}s",
            engine.retrieval_top_k, engine.retrieval_timeout_secs, engine.generation_timeout_secs
        ),
    }
}
