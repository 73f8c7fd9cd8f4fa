use foodie_core::config::{AppConfig, LoadOptions};
use foodie_core::domain::menu::MenuDocument;
use foodie_core::ordering::availability::AvailabilityService;
use foodie_core::ordering::Storefront;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Warn,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: &LoadOptions, json_output: bool) -> String {
    let report = build_report(options);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_menu(&config));
            checks.push(check_llm_credential(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["menu_catalog", "llm_credential"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let any_fail = checks
        .iter()
        .any(|check| matches!(check.status, CheckStatus::Fail | CheckStatus::Skipped));
    let any_warn = checks.iter().any(|check| check.status == CheckStatus::Warn);
    let (overall_status, summary) = if any_fail {
        (CheckStatus::Fail, "doctor: one or more readiness checks failed")
    } else if any_warn {
        (CheckStatus::Warn, "doctor: ready with warnings; conversational ordering is disabled")
    } else {
        (CheckStatus::Pass, "doctor: all readiness checks passed")
    };

    DoctorReport { overall_status, summary: summary.to_string(), checks }
}

fn check_menu(config: &AppConfig) -> DoctorCheck {
    let source = config
        .menu
        .path
        .as_ref()
        .map(|path| format!("`{}`", path.display()))
        .unwrap_or_else(|| "builtin menu".to_string());

    let storefront = MenuDocument::load(config.menu.path.as_deref())
        .map_err(|error| error.to_string())
        .and_then(|document| Storefront::from_document(document).map_err(|error| error.to_string()));

    match storefront {
        Ok(storefront) => {
            let in_stock = storefront
                .catalog
                .categories()
                .flat_map(|(_, items)| items)
                .filter(|item| storefront.inventory.is_available(item.id.as_str()))
                .count();
            DoctorCheck {
                name: "menu_catalog",
                status: CheckStatus::Pass,
                details: format!(
                    "{} items loaded from {source}; {in_stock} in stock",
                    storefront.catalog.len()
                ),
            }
        }
        Err(error) => DoctorCheck { name: "menu_catalog", status: CheckStatus::Fail, details: error },
    }
}

fn check_llm_credential(config: &AppConfig) -> DoctorCheck {
    if config.llm.has_api_key() {
        DoctorCheck {
            name: "llm_credential",
            status: CheckStatus::Pass,
            details: format!("credential present for model `{}`", config.llm.model),
        }
    } else {
        DoctorCheck {
            name: "llm_credential",
            status: CheckStatus::Warn,
            details: "no API key; set FOODIE_LLM_API_KEY or GROQ_API_KEY".to_string(),
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Warn => "warn",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
