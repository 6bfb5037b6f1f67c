//! Pipeline startup, worker supervision and shutdown brokering.

use std::thread::JoinHandle;

use super::aggregator::Aggregator;
use super::config::Config;
use super::control::ControlPlane;
use super::error::SupervisorError;
use super::feeder::Feeder;
use super::ingestor::Ingestor;
use super::recorder::Recorder;
use super::stream::byte_stream;

/// Where the datagrams come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The detector network, via the UDP socket
    Udp,
    /// The synthetic feeder, for running without hardware
    Synthetic,
}

/// Bring the pipeline up, run it until `QUIT`, and tear it down.
///
/// Startup order: clear stale control files, create the two byte streams,
/// spawn the recorder and the cuber as worker threads, then run the ingest
/// source on the calling thread. When ingest returns its stream producers
/// drop, so both workers drain and exit even if they missed the `QUIT` poll.
/// Workers are never restarted; a crashed worker is a lost session, and the
/// others keep running until shutdown.
pub fn run(config: &Config, source: Source) -> Result<(), SupervisorError> {
    let control = ControlPlane::new(&config.ramdisk_path);
    control.remove_all()?;

    let (recorder_tx, recorder_rx) = byte_stream(config.stream_depth);
    let (cuber_tx, cuber_rx) = byte_stream(config.stream_depth);

    let recorder = Recorder::new(recorder_rx, control.clone());
    let recorder_handle = std::thread::Builder::new()
        .name("recorder".into())
        .spawn(move || recorder.run())?;

    let aggregator = Aggregator::new(cuber_rx, control.clone(), config);
    let cuber_handle = std::thread::Builder::new()
        .name("cuber".into())
        .spawn(move || aggregator.run())?;

    // a bind failure must not short-circuit past the joins below: dropping
    // the unused producers is what lets the workers drain and exit
    let ingest_result = match source {
        Source::Udp => Ingestor::bind(config)
            .and_then(|ingestor| ingestor.run(recorder_tx, cuber_tx, &control)),
        Source::Synthetic => Feeder::new().run(recorder_tx, cuber_tx, &control),
    };

    // collect the workers before reporting the ingest outcome so a fatal
    // socket error still tears the whole pipeline down
    let recorder_result = join_worker(recorder_handle, "recorder")?;
    let cuber_result = join_worker(cuber_handle, "cuber")?;

    if let Err(e) = &recorder_result {
        spdlog::error!("Recorder worker failed: {e}");
    }
    if let Err(e) = &cuber_result {
        spdlog::error!("Cuber worker failed: {e}");
    }
    ingest_result?;
    recorder_result.map_err(SupervisorError::RecorderError)?;
    cuber_result.map_err(SupervisorError::AggregatorError)?;
    spdlog::info!("Supervisor: pipeline shut down");
    Ok(())
}

fn join_worker<E>(
    handle: JoinHandle<Result<(), E>>,
    name: &'static str,
) -> Result<Result<(), E>, SupervisorError> {
    handle
        .join()
        .map_err(|_| SupervisorError::WorkerPanic(name))
}
