/// Linear learning rate scheduler with warmup
///
/// Implements the schedule used for transformer fine-tuning:
/// - Linear warmup from 0 to lr_init over warmup_steps
/// - Linear decay from lr_init to 0 over the remaining steps

/// Linear scheduler configuration
#[derive(Debug, Clone)]
pub struct LinearSchedulerConfig {
    /// Peak learning rate, reached at the end of warmup
    pub lr_init: f64,
    /// Number of warmup steps
    pub warmup_steps: usize,
    /// Total number of training steps
    pub total_steps: usize,
}

impl Default for LinearSchedulerConfig {
    fn default() -> Self {
        Self {
            lr_init: 2e-5,
            warmup_steps: 1000,
            total_steps: 10000,
        }
    }
}

/// Linear warmup/decay learning rate scheduler
pub struct LinearScheduler {
    config: LinearSchedulerConfig,
    current_step: usize,
}

impl LinearScheduler {
    /// Create new linear scheduler
    pub fn new(config: LinearSchedulerConfig) -> Self {
        Self {
            config,
            current_step: 0,
        }
    }

    /// Build a scheduler from the run's warmup proportion
    pub fn with_warmup_proportion(lr_init: f64, warmup_prop: f64, total_steps: usize) -> Self {
        let warmup_steps = (total_steps as f64 * warmup_prop) as usize;
        Self::new(LinearSchedulerConfig {
            lr_init,
            warmup_steps,
            total_steps,
        })
    }

    /// Get learning rate for current step
    pub fn get_lr(&self) -> f64 {
        self.get_lr_at_step(self.current_step)
    }

    /// Get learning rate for a specific step
    pub fn get_lr_at_step(&self, step: usize) -> f64 {
        if step < self.config.warmup_steps {
            // Linear warmup: lr = lr_init * (step / warmup_steps)
            self.config.lr_init * (step as f64 / self.config.warmup_steps as f64)
        } else {
            let denom = self.config.total_steps.saturating_sub(self.config.warmup_steps);
            if denom == 0 {
                return 0.0;
            }

            // Linear decay to 0 at total_steps
            let remaining = self.config.total_steps.saturating_sub(step) as f64;
            self.config.lr_init * (remaining / denom as f64).clamp(0.0, 1.0)
        }
    }

    /// Step the scheduler (increment step counter)
    pub fn step(&mut self) {
        self.current_step += 1;
    }

    /// Get current step
    pub fn get_step(&self) -> usize {
        self.current_step
    }

    /// Reset scheduler to initial state
    pub fn reset(&mut self) {
        self.current_step = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warmup_phase() {
        let config = LinearSchedulerConfig {
            lr_init: 1.0,
            warmup_steps: 100,
            total_steps: 1000,
        };

        let scheduler = LinearScheduler::new(config);

        // At step 0, lr should be 0
        assert!((scheduler.get_lr_at_step(0) - 0.0).abs() < 1e-9);

        // At step 50 (halfway through warmup), lr should be 0.5
        assert!((scheduler.get_lr_at_step(50) - 0.5).abs() < 1e-9);

        // At step 100 (end of warmup), lr should be 1.0
        assert!((scheduler.get_lr_at_step(100) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_linear_decay() {
        let config = LinearSchedulerConfig {
            lr_init: 1.0,
            warmup_steps: 0,
            total_steps: 1000,
        };

        let scheduler = LinearScheduler::new(config);

        // At step 0, lr should be lr_init
        assert!((scheduler.get_lr_at_step(0) - 1.0).abs() < 1e-9);

        // At step 500 (halfway), lr should be 0.5
        assert!((scheduler.get_lr_at_step(500) - 0.5).abs() < 1e-9);

        // At step 1000 (end), lr should be 0
        assert!((scheduler.get_lr_at_step(1000) - 0.0).abs() < 1e-9);

        // Past the end, lr stays 0
        assert!((scheduler.get_lr_at_step(2000) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_scheduler_stepping() {
        let config = LinearSchedulerConfig {
            lr_init: 1.0,
            warmup_steps: 10,
            total_steps: 100,
        };

        let mut scheduler = LinearScheduler::new(config);

        assert_eq!(scheduler.get_step(), 0);

        scheduler.step();
        assert_eq!(scheduler.get_step(), 1);

        scheduler.step();
        assert_eq!(scheduler.get_step(), 2);

        // LR should be increasing during warmup
        let lr1 = scheduler.get_lr_at_step(5);
        let lr2 = scheduler.get_lr_at_step(8);
        assert!(lr2 > lr1);
    }

    #[test]
    fn test_reset() {
        let mut scheduler = LinearScheduler::new(LinearSchedulerConfig::default());

        scheduler.step();
        scheduler.step();
        assert_eq!(scheduler.get_step(), 2);

        scheduler.reset();
        assert_eq!(scheduler.get_step(), 0);
    }

    #[test]
    fn test_lr_never_exceeds_init() {
        let config = LinearSchedulerConfig {
            lr_init: 1.0,
            warmup_steps: 100,
            total_steps: 1000,
        };

        let scheduler = LinearScheduler::new(config.clone());

        for step in 0..=config.total_steps {
            let lr = scheduler.get_lr_at_step(step);
            assert!(
                lr <= config.lr_init + 1e-9,
                "LR {} exceeds max {} at step {}",
                lr,
                config.lr_init,
                step
            );
            assert!(lr >= 0.0);
        }
    }

    #[test]
    fn test_warmup_proportion_constructor() {
        let scheduler = LinearScheduler::with_warmup_proportion(2e-5, 0.1, 500);

        // 10% of 500 steps warm up
        assert!((scheduler.get_lr_at_step(50) - 2e-5).abs() < 1e-12);
        assert!(scheduler.get_lr_at_step(25) < 2e-5);
    }
}
