use indicatif::{ProgressBar, ProgressStyle};
use phishzil_scanner::{ScanEvent, ThreatReport};

/// How scan progress is written to the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Animated bar with revealed steps printed above it
    Bar,
    /// One line per event
    Plain,
    /// One JSON object per event on stdout
    Json,
}

/// Renders one scan session.
pub struct Renderer {
    mode: OutputMode,
    pb: Option<ProgressBar>,
}

impl Renderer {
    pub fn new(mode: OutputMode, subject: &str) -> Self {
        let pb = (mode == OutputMode::Bar).then(|| {
            let pb = ProgressBar::new(100);
            pb.set_style(
                ProgressStyle::with_template(
                    "{spinner:.red} DISARMING [{bar:40.red/white}] {pos}% {msg}",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
            );
            pb.println(format!("Scanning: {subject}"));
            pb
        });
        if mode == OutputMode::Plain {
            println!("Scanning: {subject}");
        }
        Self { mode, pb }
    }

    pub fn render(&self, event: &ScanEvent) -> anyhow::Result<()> {
        if self.mode == OutputMode::Json {
            println!("{}", serde_json::to_string(event)?);
            return Ok(());
        }

        let line = match event {
            ScanEvent::StageEntered {
                title,
                subtitle,
                progress,
                ..
            } => {
                if let Some(pb) = &self.pb {
                    pb.set_position(u64::from(*progress));
                    pb.set_message(title.clone());
                }
                format!("{title} - {subtitle} ({progress}%)")
            }
            ScanEvent::StepRevealed { label, .. } => format!("  [x] {label}"),
            ScanEvent::Completed(outcome) => {
                if let Some(pb) = &self.pb {
                    pb.finish_with_message("complete");
                }
                format!("Scan of {} complete", outcome.subject_label)
            }
        };

        match &self.pb {
            Some(pb) => pb.println(line),
            None => println!("{line}"),
        }
        Ok(())
    }

    pub fn cancelled(&self) {
        match &self.pb {
            Some(pb) => pb.abandon_with_message("cancelled"),
            None if self.mode == OutputMode::Plain => println!("Scan cancelled"),
            None => {}
        }
    }

    pub fn report(&self, report: &ThreatReport) -> anyhow::Result<()> {
        if self.mode == OutputMode::Json {
            println!("{}", serde_json::to_string(report)?);
        } else {
            println!("\n{report}");
        }
        Ok(())
    }
}
