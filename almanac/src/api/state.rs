use std::sync::Arc;

use crate::calendar::CalendarExporter;
use crate::chart::ChartProvider;
use crate::clock::Clock;
use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::interpretation::InterpretationGenerator;
use crate::llm::LlmProvider;
use crate::services::{CycleService, GenerationOrchestrator, OrchestratorConfig, SweepManager};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseBackend>,
    pub llm: LlmProvider,
    pub cycles: CycleService,
    pub orchestrator: GenerationOrchestrator,
    pub exporter: CalendarExporter,
    pub sweeper: SweepManager,
}

impl AppState {
    pub fn new(
        config: Config,
        db: Arc<dyn DatabaseBackend>,
        chart: Arc<dyn ChartProvider>,
        generator: Arc<dyn InterpretationGenerator>,
        llm: LlmProvider,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let config = Arc::new(config);
        let cycles = CycleService::new(db.clone(), chart, clock.clone());
        let orchestrator = GenerationOrchestrator::new(
            db.clone(),
            generator,
            clock.clone(),
            OrchestratorConfig::from(&config.interpretation),
        );
        let exporter = CalendarExporter::new(
            db.clone(),
            cycles.clone(),
            clock.clone(),
            config.calendar.clone(),
        );
        let sweeper = SweepManager::new(
            db.clone(),
            clock,
            config.interpretation.sweep_interval_secs,
        );

        Self {
            config,
            db,
            llm,
            cycles,
            orchestrator,
            exporter,
            sweeper,
        }
    }
}
