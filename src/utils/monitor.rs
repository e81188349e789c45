#[cfg(feature = "cli")]
use std::sync::Mutex;
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

#[derive(Debug, Clone)]
pub struct ResourceSnapshot {
    pub cpu_usage: f32,
    pub memory_mb: u64,
    pub peak_memory_mb: u64,
}

/// 記錄每個建置階段的耗時，啟用時另外記錄行程的 CPU 與記憶體
pub struct BuildMonitor {
    enabled: bool,
    started: Instant,
    #[cfg(feature = "cli")]
    system: Option<Mutex<(System, Pid, u64)>>,
}

impl BuildMonitor {
    pub fn new(enabled: bool) -> Self {
        #[cfg(feature = "cli")]
        let system = if enabled {
            sysinfo::get_current_pid().ok().map(|pid| {
                let mut system = System::new();
                system.refresh_processes_specifics(
                    ProcessesToUpdate::Some(&[pid]),
                    true,
                    ProcessRefreshKind::everything(),
                );
                Mutex::new((system, pid, 0))
            })
        } else {
            None
        };

        Self {
            enabled,
            started: Instant::now(),
            #[cfg(feature = "cli")]
            system,
        }
    }

    pub fn disabled() -> Self {
        Self::new(false)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    #[cfg(feature = "cli")]
    pub fn snapshot(&self) -> Option<ResourceSnapshot> {
        let mut guard = self.system.as_ref()?.lock().ok()?;
        let (system, pid, peak) = &mut *guard;
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[*pid]),
            true,
            ProcessRefreshKind::everything(),
        );
        let process = system.process(*pid)?;
        let memory_mb = process.memory() / 1024 / 1024;
        if memory_mb > *peak {
            *peak = memory_mb;
        }
        Some(ResourceSnapshot {
            cpu_usage: process.cpu_usage(),
            memory_mb,
            peak_memory_mb: *peak,
        })
    }

    #[cfg(not(feature = "cli"))]
    pub fn snapshot(&self) -> Option<ResourceSnapshot> {
        None
    }

    pub fn stage_finished(&self, stage: &str, stage_elapsed: Duration) {
        tracing::debug!("⏱️ {} finished in {:?}", stage, stage_elapsed);
        if !self.enabled {
            return;
        }
        if let Some(stats) = self.snapshot() {
            tracing::info!(
                "📊 {} - CPU: {:.1}%, Memory: {}MB, Peak: {}MB, Stage: {:?}, Total: {:?}",
                stage,
                stats.cpu_usage,
                stats.memory_mb,
                stats.peak_memory_mb,
                stage_elapsed,
                self.elapsed()
            );
        } else {
            tracing::info!(
                "📊 {} - Stage: {:?}, Total: {:?}",
                stage,
                stage_elapsed,
                self.elapsed()
            );
        }
    }

    pub fn log_final(&self) {
        if self.enabled {
            tracing::info!("📊 Build finished - Total Time: {:?}", self.elapsed());
        }
    }
}

impl Default for BuildMonitor {
    fn default() -> Self {
        Self::disabled()
    }
}
