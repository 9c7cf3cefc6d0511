// THEORY:
// Segmentation is synchronous and CPU-bound. A caller driving it from a UI or an
// async service should not run it on the thread that handles input, so this
// module moves the work onto tokio's blocking pool.
//
// Key architectural principles:
// 1.  **Offload, Don't Change**: Every entry point here runs the exact same
//     `CountingPipeline::segment`. Only where it runs is different.
// 2.  **Cancellation by Dropping**: No stage blocks on I/O, so cancelling is just
//     discarding the result. Dropping a pending future does that.
// 3.  **Round-Robin Workers**: `BatchCounter` keeps a fixed pool of workers fed by
//     a dispatcher. Each task carries a `oneshot` sender for its own answer, so
//     results come back to the right caller regardless of completion order.
// 4.  **No Shared State**: Images are independent. Workers share only the
//     immutable pipeline configuration.

use crate::error::{PipelineError, Result};
use crate::pipeline::{CountingPipeline, DetectionResult, PixelBuffer};
use futures::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Runs `pipeline.segment(image)` on the blocking thread pool.
pub async fn segment_offloaded(pipeline: CountingPipeline, image: PixelBuffer) -> Result<DetectionResult> {
    tokio::task::spawn_blocking(move || pipeline.segment(&image))
        .await
        .map_err(|_| PipelineError::WorkerUnavailable)?
}

struct CountTask {
    image: PixelBuffer,
    result_sender: oneshot::Sender<Result<DetectionResult>>,
}

/// A fixed pool of segmentation workers for counting many images concurrently.
pub struct BatchCounter {
    task_sender: mpsc::UnboundedSender<CountTask>,
    workers: Vec<JoinHandle<()>>,
    dispatcher: JoinHandle<()>,
}

impl BatchCounter {
    /// One worker per logical CPU. Must be called from within a tokio runtime.
    pub fn new(pipeline: CountingPipeline) -> Self {
        Self::with_workers(pipeline, num_cpus::get())
    }

    pub fn with_workers(pipeline: CountingPipeline, worker_count: usize) -> Self {
        let worker_count = worker_count.max(1);
        let (task_sender, mut task_receiver) = mpsc::unbounded_channel::<CountTask>();

        let (worker_senders, worker_receivers): (Vec<_>, Vec<_>) = (0..worker_count)
            .map(|_| mpsc::unbounded_channel::<CountTask>())
            .unzip();

        // Dispatcher hands tasks out in turn.
        let dispatcher = tokio::spawn(async move {
            let mut worker_idx = 0;
            while let Some(task) = task_receiver.recv().await {
                if worker_senders[worker_idx].send(task).is_err() {
                    break;
                }
                worker_idx = (worker_idx + 1) % worker_senders.len();
            }
        });

        let mut workers = Vec::with_capacity(worker_count);
        for (id, mut worker_receiver) in worker_receivers.into_iter().enumerate() {
            let worker_pipeline = pipeline.clone();
            workers.push(tokio::spawn(async move {
                while let Some(task) = worker_receiver.recv().await {
                    trace!(worker = id, "segmenting image");
                    let result = segment_offloaded(worker_pipeline.clone(), task.image).await;
                    // The caller may have stopped waiting; that is a cancellation, not an error.
                    let _ = task.result_sender.send(result);
                }
            }));
        }

        debug!(workers = worker_count, "started batch counter");
        Self {
            task_sender,
            workers,
            dispatcher,
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Segments one image on the pool.
    pub async fn count(&self, image: PixelBuffer) -> Result<DetectionResult> {
        let (result_sender, result_receiver) = oneshot::channel();
        self.task_sender
            .send(CountTask {
                image,
                result_sender,
            })
            .map_err(|_| PipelineError::WorkerUnavailable)?;

        result_receiver
            .await
            .map_err(|_| PipelineError::WorkerUnavailable)?
    }

    /// Segments every image concurrently. Results are in input order.
    pub async fn count_all(&self, images: Vec<PixelBuffer>) -> Vec<Result<DetectionResult>> {
        join_all(images.into_iter().map(|image| self.count(image))).await
    }

    /// Stops accepting work and waits for in-flight images to finish.
    pub async fn shutdown(self) {
        drop(self.task_sender);
        let _ = self.dispatcher.await;
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A black `size`x`size` image with white squares of `side` at the given corners.
    fn squares(size: u32, side: u32, corners: &[(u32, u32)]) -> PixelBuffer {
        let mut data = vec![0u8; (size * size * 4) as usize];
        for &(left, top) in corners {
            for y in top..top + side {
                for x in left..left + side {
                    let i = ((y * size + x) * 4) as usize;
                    data[i..i + 4].copy_from_slice(&[255, 255, 255, 255]);
                }
            }
        }
        PixelBuffer::new(size, size, data).unwrap()
    }

    #[tokio::test]
    async fn offloaded_matches_inline() {
        let pipeline = CountingPipeline::default();
        let image = squares(100, 10, &[(10, 10), (70, 70)]);
        let inline = pipeline.segment(&image).unwrap();
        let offloaded = segment_offloaded(pipeline, image).await.unwrap();
        assert_eq!(inline, offloaded);
    }

    #[tokio::test]
    async fn offloaded_reports_invalid_images() {
        let image = PixelBuffer::new(0, 0, Vec::new()).unwrap();
        let result = segment_offloaded(CountingPipeline::default(), image).await;
        assert!(matches!(result, Err(PipelineError::InvalidImage { .. })));
    }

    #[tokio::test]
    async fn batch_results_keep_input_order() {
        let counter = BatchCounter::with_workers(CountingPipeline::default(), 3);
        assert_eq!(counter.worker_count(), 3);

        let images = vec![
            squares(100, 10, &[(10, 10)]),
            squares(100, 10, &[(10, 10), (40, 40), (70, 70)]),
            PixelBuffer::new(0, 5, Vec::new()).unwrap(),
            squares(100, 10, &[(10, 10), (70, 70)]),
        ];
        let results = counter.count_all(images).await;

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap().blobs.len(), 1);
        assert_eq!(results[1].as_ref().unwrap().blobs.len(), 3);
        assert!(results[2].is_err());
        assert_eq!(results[3].as_ref().unwrap().blobs.len(), 2);

        counter.shutdown().await;
    }
}
