//! Health check for the `doctor` command.
//!
//! Reports on:
//! - the database connection and applied migrations
//! - taxonomy, alias and categorized-file counts
//! - taxonomy invariants re-checked against storage
//! - Ollama reachability and installed models

use anyhow::Result;

use crate::CategorizationService;
use crate::llm::OllamaClientBuilder;
use crate::service::CacheStats;

// ANSI color codes for terminal output
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";

/// Health status for a component.
#[derive(Debug, Clone, PartialEq)]
pub enum HealthStatus {
    Ok,
    /// Functional, but worth a look.
    Warning(String),
    Error(String),
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, HealthStatus::Ok)
    }
}

#[derive(Debug)]
pub struct DatabaseHealth {
    pub status: HealthStatus,
    pub file_path: String,
}

#[derive(Debug)]
pub struct MigrationInfo {
    pub version: u32,
    pub description: String,
    pub applied_at: i64,
}

#[derive(Debug)]
pub struct OllamaHealth {
    pub status: HealthStatus,
    pub base_url: String,
    pub models: Vec<String>,
}

/// Everything the doctor looked at.
#[derive(Debug)]
pub struct HealthReport {
    pub database: DatabaseHealth,
    pub migrations: Vec<MigrationInfo>,
    pub stats: CacheStats,
    pub invariants: HealthStatus,
    pub ollama: OllamaHealth,
}

impl HealthReport {
    /// True unless a local component failed; an unreachable Ollama is only a warning.
    pub fn is_healthy(&self) -> bool {
        self.database.status.is_ok() && self.invariants.is_ok()
    }
}

/// Gathers a health report without printing it.
pub fn collect_health_report(
    db_path: &str,
    service: &CategorizationService,
    ollama_host: &str,
) -> Result<HealthReport> {
    Ok(HealthReport {
        database: check_database_health(db_path, service),
        migrations: get_applied_migrations(service)?,
        stats: service.stats()?,
        invariants: check_invariants(service),
        ollama: check_ollama_health(ollama_host),
    })
}

/// Performs all health checks and prints results.
pub fn run_health_checks(
    db_path: &str,
    service: &CategorizationService,
    ollama_host: &str,
) -> Result<HealthReport> {
    let report = collect_health_report(db_path, service, ollama_host)?;
    print_health_report(&report);
    Ok(report)
}

fn check_database_health(db_path: &str, service: &CategorizationService) -> DatabaseHealth {
    let conn = service.database().connection();
    let status = match conn.query_row("SELECT 1", [], |_| Ok(())) {
        Ok(_) => HealthStatus::Ok,
        Err(e) => HealthStatus::Error(format!("Connection test failed: {}", e)),
    };

    DatabaseHealth {
        status,
        file_path: db_path.to_string(),
    }
}

fn get_applied_migrations(service: &CategorizationService) -> Result<Vec<MigrationInfo>> {
    Ok(service
        .database()
        .applied_migrations()?
        .into_iter()
        .map(|(version, applied_at, description)| MigrationInfo {
            version,
            description,
            applied_at,
        })
        .collect())
}

fn check_invariants(service: &CategorizationService) -> HealthStatus {
    match service.taxonomy().check_invariants() {
        Ok(violations) if violations.is_empty() => HealthStatus::Ok,
        Ok(violations) => HealthStatus::Error(violations.join("; ")),
        Err(e) => HealthStatus::Error(format!("Invariant check failed: {}", e)),
    }
}

fn check_ollama_health(ollama_host: &str) -> OllamaHealth {
    let client = match OllamaClientBuilder::new().base_url(ollama_host).build() {
        Ok(c) => c,
        Err(e) => {
            return OllamaHealth {
                status: HealthStatus::Warning(format!("Failed to build client: {}", e)),
                base_url: ollama_host.to_string(),
                models: Vec::new(),
            };
        }
    };

    let base_url = client.base_url().to_string();

    match client.list_models() {
        Ok(models) => OllamaHealth {
            status: if models.is_empty() {
                HealthStatus::Warning("No models installed".to_string())
            } else {
                HealthStatus::Ok
            },
            base_url,
            models,
        },
        Err(e) => OllamaHealth {
            status: HealthStatus::Warning(format!("Unreachable: {}", e)),
            base_url,
            models: Vec::new(),
        },
    }
}

// ============================================================================
// Pretty Printing
// ============================================================================

fn status_symbol(status: &HealthStatus) -> &'static str {
    match status {
        HealthStatus::Ok => "\u{2713}",
        HealthStatus::Warning(_) => "!",
        HealthStatus::Error(_) => "\u{2717}",
    }
}

fn status_color(status: &HealthStatus) -> &'static str {
    match status {
        HealthStatus::Ok => GREEN,
        HealthStatus::Warning(_) => YELLOW,
        HealthStatus::Error(_) => RED,
    }
}

fn status_text(status: &HealthStatus, ok_text: &str) -> String {
    match status {
        HealthStatus::Ok => ok_text.to_string(),
        HealthStatus::Warning(message) | HealthStatus::Error(message) => message.clone(),
    }
}

fn print_health_report(report: &HealthReport) {
    println!("{}ftax doctor{}", BOLD, RESET);
    println!();

    let db = &report.database;
    println!("{}Database{}", BOLD, RESET);
    println!(
        "  {}{}{} Connection: {}",
        status_color(&db.status),
        status_symbol(&db.status),
        RESET,
        status_text(&db.status, "OK")
    );
    println!("    {}Path: {}{}", DIM, db.file_path, RESET);
    println!();

    println!("{}Migrations{}", BOLD, RESET);
    if report.migrations.is_empty() {
        println!("  {}No migrations applied{}", YELLOW, RESET);
    } else {
        for m in &report.migrations {
            println!(
                "  {}{}{} v{}: {}",
                GREEN,
                status_symbol(&HealthStatus::Ok),
                RESET,
                m.version,
                m.description
            );
        }
    }
    println!();

    println!("{}Taxonomy{}", BOLD, RESET);
    println!(
        "  {}{}{} Invariants: {}",
        status_color(&report.invariants),
        status_symbol(&report.invariants),
        RESET,
        status_text(&report.invariants, "OK")
    );
    println!("  Entries:    {:>6}", report.stats.taxonomy_entries);
    println!("  Aliases:    {:>6}", report.stats.aliases);
    println!("  Files:      {:>6}", report.stats.categorized_files);
    println!();

    let ollama = &report.ollama;
    println!("{}Ollama{}", BOLD, RESET);
    println!(
        "  {}{}{} Status: {}",
        status_color(&ollama.status),
        status_symbol(&ollama.status),
        RESET,
        status_text(&ollama.status, "Connected")
    );
    if !ollama.base_url.is_empty() {
        println!("    {}URL: {}{}", DIM, ollama.base_url, RESET);
    }
    if !ollama.models.is_empty() {
        let models_display = if ollama.models.len() > 3 {
            format!(
                "{}, ... ({} more)",
                ollama.models[..3].join(", "),
                ollama.models.len() - 3
            )
        } else {
            ollama.models.join(", ")
        };
        println!("    {}Models: {}{}", DIM, models_display, RESET);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, FileType};

    fn service() -> CategorizationService {
        CategorizationService::new(Database::in_memory().unwrap()).unwrap()
    }

    #[test]
    fn healthy_database_reports_counts_and_migrations() {
        let mut service = service();
        let resolved = service.resolve_category("Images", "Photos").unwrap();
        service.resolve_category("Image", "Photo").unwrap();
        service
            .insert_or_update_file_with_categorization("a.jpg", FileType::File, "/pics", &resolved)
            .unwrap();

        // Port 9 (discard) is closed, so Ollama is a warning, not a failure.
        let report = collect_health_report(":memory:", &service, "http://127.0.0.1:9").unwrap();

        assert!(report.is_healthy());
        assert_eq!(report.migrations.len(), crate::db::MIGRATIONS.len());
        assert_eq!(report.stats.taxonomy_entries, 1);
        assert_eq!(report.stats.aliases, 2);
        assert_eq!(report.stats.categorized_files, 1);
        assert!(matches!(report.ollama.status, HealthStatus::Warning(_)));
    }

    #[test]
    fn invariant_violations_make_report_unhealthy() {
        let mut service = service();
        service.resolve_category("Media", "Music").unwrap();
        service
            .database()
            .connection()
            .execute("UPDATE taxonomy SET frequency = 42", [])
            .unwrap();

        let report = collect_health_report(":memory:", &service, "not a url").unwrap();

        assert!(!report.is_healthy());
        assert!(matches!(report.invariants, HealthStatus::Error(ref m) if m.contains("frequency")));
        assert!(matches!(report.ollama.status, HealthStatus::Warning(_)));
    }
}
