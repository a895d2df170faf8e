use crate::core::Pipeline;
use crate::utils::error::Result;

/// Outcome of one engine run.
#[derive(Debug, Clone)]
pub struct EtlRun<R> {
    pub report: R,
    pub output_path: String,
}

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub fn run(&self) -> Result<EtlRun<P::Report>> {
        let name = self.pipeline.name();
        tracing::info!("Starting {} extraction...", name);

        // Extract
        let source = self.pipeline.extract()?;
        tracing::debug!("{}: extract finished", name);

        // Transform
        let report = self.pipeline.transform(source)?;
        tracing::debug!("{}: transform finished", name);

        // Load
        let output_path = self.pipeline.load(&report)?;
        tracing::info!("Output saved to: {}", output_path);

        Ok(EtlRun {
            report,
            output_path,
        })
    }
}
