//! Runs the extractor over a batch of images.

use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use crate::models::record::{Record, ResultSet};
use crate::ocr::OcrClient;

use super::{failure_message, BatchProgress, CancelFlag, Extractor, ImageInput, ImageState};

/// Error text for images skipped after cancellation.
pub const CANCELLED: &str = "cancelled";

type ProgressFn<'a> = Box<dyn Fn(BatchProgress) + Send + Sync + 'a>;

/// Processes a batch of images into a [`ResultSet`].
pub struct BatchProcessor<'a> {
    client: &'a dyn OcrClient,
    extractor: &'a Extractor,
    concurrency: usize,
    cancel: CancelFlag,
    progress: Option<ProgressFn<'a>>,
}

impl<'a> BatchProcessor<'a> {
    pub fn new(client: &'a dyn OcrClient, extractor: &'a Extractor) -> Self {
        Self {
            client,
            extractor,
            concurrency: 1,
            cancel: CancelFlag::new(),
            progress: None,
        }
    }

    /// Number of images in flight at once. Zero is treated as one.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Use an externally owned cancel flag.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Called once per finished image, in completion order.
    pub fn with_progress(mut self, progress: impl Fn(BatchProgress) + Send + Sync + 'a) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Process every image. Always returns one record per input, in input order.
    pub async fn run(&self, inputs: Vec<ImageInput>) -> ResultSet {
        let total = inputs.len();
        let done = AtomicUsize::new(0);
        let done = &done;

        info!(
            "Processing {} images via {} (concurrency {})",
            total,
            self.client.name(),
            self.concurrency
        );

        let records: Vec<Record> = stream::iter(inputs)
            .map(|input| async move {
                let record = self.process_one(input).await;

                let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(progress) = &self.progress {
                    progress(BatchProgress {
                        done: finished,
                        total,
                    });
                }
                record
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let results = ResultSet::new(self.extractor.table().columns(), records);
        info!(
            "Batch finished: {} ok, {} failed",
            results.len() - results.failed().count(),
            results.failed().count()
        );
        results
    }

    async fn process_one(&self, input: ImageInput) -> Record {
        let ImageInput { name, source } = input;

        if self.cancel.is_cancelled() {
            debug!("{}: skipped, batch cancelled", name);
            return Record::failed(name, CANCELLED);
        }

        let outcome = match source.load() {
            Ok(bytes) => {
                debug!("{}: {:?} ({} bytes)", name, ImageState::Pending, bytes.len());
                self.extractor.extract_bytes(self.client, &name, &bytes).await
            }
            Err(e) => Err(e.into()),
        };

        let record = match outcome {
            Ok(extraction) => Record::extracted(&name, extraction.fields),
            Err(e) => {
                let message = failure_message(&e);
                warn!("{}: {:?}: {}", name, ImageState::Failed, message);
                Record::failed(&name, message)
            }
        };

        debug!("{}: {:?}", name, ImageState::Recorded);
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OcrError;
    use crate::fields::{FieldRuleConfig, FieldTable, FieldTableConfig, MatchPolicy, TextCorrections};
    use crate::models::record::Outcome;
    use crate::region::{NamedRegion, RegionSet, RegionSpec};
    use async_trait::async_trait;
    use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers by the dimensions of the uploaded image, so responses stay
    /// attached to the right input under concurrency.
    struct ScriptedClient {
        script: HashMap<(u32, u32), Result<String, String>>,
        delay_for_width: bool,
        calls: AtomicUsize,
    }

    impl ScriptedClient {
        fn new(script: Vec<((u32, u32), Result<&str, &str>)>) -> Self {
            Self {
                script: script
                    .into_iter()
                    .map(|(k, v)| (k, v.map(str::to_string).map_err(str::to_string)))
                    .collect(),
                delay_for_width: false,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl OcrClient for ScriptedClient {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn recognize(&self, jpeg: &[u8]) -> Result<String, OcrError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let image = image::load_from_memory(jpeg).map_err(|e| OcrError::Transport(e.to_string()))?;
            let key = (image.width(), image.height());

            if self.delay_for_width {
                // Earlier (narrower) inputs finish last.
                let millis = 40u64.saturating_sub(u64::from(key.0));
                tokio::time::sleep(Duration::from_millis(millis)).await;
            }

            match self.script.get(&key) {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(message)) => Err(OcrError::Backend(message.clone())),
                None => Err(OcrError::Transport(format!("no script for {:?}", key))),
            }
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([255, 255, 255])));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn name_only_extractor() -> Extractor {
        let table = FieldTable::compile(&FieldTableConfig {
            sections: vec![],
            rules: vec![FieldRuleConfig::new("이름", r"이름[:\t ]*(\S+)")],
        })
        .unwrap();
        Extractor::new(table, &RegionSet::default(), TextCorrections::default(), 90).unwrap()
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let client = ScriptedClient::new(vec![
            ((10, 10), Ok("이름: 가")),
            ((11, 10), Ok("이름: 나")),
            ((12, 10), Err("quota exceeded")),
            ((13, 10), Ok("이름: 라")),
            ((14, 10), Ok("이름: 마")),
        ]);
        let extractor = name_only_extractor();
        let inputs = (10..15)
            .map(|w| ImageInput::new(format!("{}.png", w), png(w, 10)))
            .collect();

        let results = BatchProcessor::new(&client, &extractor).run(inputs).await;

        assert_eq!(results.len(), 5);
        assert_eq!(results.records[2].error(), Some("quota exceeded"));
        let names: Vec<_> = results.records.iter().map(|r| r.get("이름")).collect();
        assert_eq!(names, vec![Some("가"), Some("나"), None, Some("라"), Some("마")]);
        assert_eq!(results.failed().count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_output_keeps_input_order() {
        let mut client = ScriptedClient::new(
            (10..20)
                .map(|w| ((w, 8), Ok(if w % 2 == 0 { "이름: 짝" } else { "이름: 홀" })))
                .collect(),
        );
        client.delay_for_width = true;

        let extractor = name_only_extractor();
        let inputs = (10..20)
            .map(|w| ImageInput::new(format!("img{}.png", w), png(w, 8)))
            .collect();

        let results = BatchProcessor::new(&client, &extractor)
            .with_concurrency(4)
            .run(inputs)
            .await;

        let files: Vec<_> = results.records.iter().map(|r| r.file.clone()).collect();
        let expected: Vec<_> = (10..20).map(|w| format!("img{}.png", w)).collect();
        assert_eq!(files, expected);
        assert_eq!(results.records[1].get("이름"), Some("홀"));
    }

    #[tokio::test]
    async fn test_undecodable_image_is_recorded() {
        let client = ScriptedClient::new(vec![((10, 10), Ok("이름: 가"))]);
        let extractor = name_only_extractor();
        let inputs = vec![
            ImageInput::new("broken.jpg", b"not an image".to_vec()),
            ImageInput::new("ok.png", png(10, 10)),
        ];

        let results = BatchProcessor::new(&client, &extractor).run(inputs).await;

        assert!(!results.records[0].is_ok());
        assert!(results.records[1].is_ok());
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unreadable_file_is_recorded_in_its_slot() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("b.png");
        std::fs::write(&good, png(10, 10)).unwrap();
        // A directory named like an image cannot be read as a file.
        let not_a_file = dir.path().join("a.jpg");
        std::fs::create_dir(&not_a_file).unwrap();

        let client = ScriptedClient::new(vec![((10, 10), Ok("이름: 가"))]);
        let extractor = name_only_extractor();
        let inputs = vec![
            ImageInput::from_path("a.jpg", not_a_file),
            ImageInput::from_path("b.png", good),
            ImageInput::from_path("c.png", dir.path().join("c.png")),
        ];

        let results = BatchProcessor::new(&client, &extractor).run(inputs).await;

        let files: Vec<_> = results.records.iter().map(|r| r.file.as_str()).collect();
        assert_eq!(files, vec!["a.jpg", "b.png", "c.png"]);
        assert!(results.records[0].error().is_some());
        assert_eq!(results.records[1].get("이름"), Some("가"));
        assert!(results.records[2].error().is_some());
        assert_eq!(client.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cancelled_batch_records_every_image() {
        let client = ScriptedClient::new(vec![((10, 10), Ok("이름: 가"))]);
        let extractor = name_only_extractor();
        let processor = BatchProcessor::new(&client, &extractor);
        processor.cancel_flag().cancel();

        let inputs = vec![
            ImageInput::new("a.png", png(10, 10)),
            ImageInput::new("b.png", png(10, 10)),
        ];
        let results = processor.run(inputs).await;

        assert_eq!(results.len(), 2);
        assert!(results.records.iter().all(|r| r.error() == Some(CANCELLED)));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_progress_reports_each_image() {
        let client = ScriptedClient::new(vec![((10, 10), Ok("이름: 가"))]);
        let extractor = name_only_extractor();
        let seen = Mutex::new(Vec::new());

        let inputs = vec![
            ImageInput::new("a.png", png(10, 10)),
            ImageInput::new("b.png", png(10, 10)),
            ImageInput::new("c.png", png(10, 10)),
        ];
        BatchProcessor::new(&client, &extractor)
            .with_progress(|p| seen.lock().unwrap().push((p.done, p.total)))
            .run(inputs)
            .await;

        assert_eq!(seen.into_inner().unwrap(), vec![(1, 3), (2, 3), (3, 3)]);
    }

    #[tokio::test]
    async fn test_region_tagged_rule_reads_only_its_region() {
        // 100x200 page; the footer crop is the bottom 20%: 100x40.
        let client = ScriptedClient::new(vec![
            ((100, 200), Ok("이름: 본문\n접수자: 본문")),
            ((100, 40), Ok("접수자: 하단")),
        ]);
        let table = FieldTable::compile(&FieldTableConfig {
            sections: vec![],
            rules: vec![
                FieldRuleConfig::new("이름", r"이름[:\t ]*(\S+)"),
                FieldRuleConfig::new("접수자", r"접수자[:\t ]*(\S+)")
                    .region("footer")
                    .policy(MatchPolicy::Last),
            ],
        })
        .unwrap();
        let regions = RegionSet::new(vec![NamedRegion::new("footer", RegionSpec::footer())]).unwrap();
        let extractor = Extractor::new(table, &regions, TextCorrections::default(), 90).unwrap();
        assert_eq!(extractor.region_names(), vec!["full", "footer"]);

        let results = BatchProcessor::new(&client, &extractor)
            .run(vec![ImageInput::new("page.png", png(100, 200))])
            .await;

        match &results.records[0].outcome {
            Outcome::Fields(fields) => {
                assert_eq!(fields[0].value.as_deref(), Some("본문"));
                assert_eq!(fields[1].value.as_deref(), Some("하단"));
            }
            Outcome::Error(e) => panic!("unexpected failure: {}", e),
        }
        assert_eq!(results.columns, vec!["이름".to_string(), "접수자".to_string()]);
    }

    #[tokio::test]
    async fn test_corrections_apply_before_parsing() {
        let client = ScriptedClient::new(vec![((10, 10), Ok("욜정: 5G 프리미어\r\n"))]);
        let table = FieldTable::compile(&FieldTableConfig {
            sections: vec![],
            rules: vec![FieldRuleConfig::new("요금제", r"요금제[:\t ]*([^\n]+)")],
        })
        .unwrap();
        let corrections = TextCorrections::new(TextCorrections::korean_defaults()).unwrap();
        let extractor = Extractor::new(table, &RegionSet::default(), corrections, 90).unwrap();

        let results = BatchProcessor::new(&client, &extractor)
            .run(vec![ImageInput::new("a.png", png(10, 10))])
            .await;

        assert_eq!(results.records[0].get("요금제"), Some("5G 프리미어"));
    }
}
