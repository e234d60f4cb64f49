use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;

use super::error::ProcessError;
use super::pipeline_logger::{NullPipelineLogger, PipelineLogger};
use super::processing_config::ProcessingConfig;
use crate::annotation::domain::frame_annotator::{FrameAnnotator, TrackOverlay};
use crate::catalog::domain::person_record::{PersonId, PersonRecord, RunId};
use crate::catalog::domain::result_store::{sort_records, ResultStore};
use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::tracking::domain::tracker::Tracker;
use crate::video::domain::video_reader::VideoReader;
use crate::video::domain::video_writer::VideoWriter;

/// Called after every frame with `(frames done, expected total)`; the total
/// is 0 when the container does not report one. Returning `false` cancels.
pub type ProgressFn = Box<dyn FnMut(usize, usize) -> bool + Send>;

/// Outcome of a successful run.
#[derive(Clone, Debug, Serialize)]
pub struct ProcessingReport {
    pub run_id: RunId,
    pub output_video: PathBuf,
    pub frames_processed: usize,
    /// Frames on which the detector failed and zero faces were assumed.
    pub detection_failures: usize,
    /// Every person confirmed during the run, in catalog order.
    pub persons: Vec<PersonRecord>,
    /// Persons whose record or face crop could not be saved to the store.
    pub unpersisted: Vec<PersonId>,
}

/// A confirmed person waiting for the run to succeed before it is stored.
struct PendingPerson {
    record: PersonRecord,
    crop: Frame,
}

struct FrameLoopOutcome {
    frames_processed: usize,
    detection_failures: usize,
    pending: Vec<PendingPerson>,
}

/// Processes one video: detect, track, stabilize labels, annotate, encode,
/// then catalog every confirmed person.
///
/// The run is all-or-nothing with respect to the video and the catalog. The
/// output is encoded to a hidden sibling file and renamed into place only
/// once the encoder is flushed, and nothing reaches the store until then.
/// Consumed by [`execute`](Self::execute).
pub struct ProcessVideoUseCase {
    reader: Box<dyn VideoReader>,
    writer: Box<dyn VideoWriter>,
    detector: Box<dyn FaceDetector>,
    annotator: Box<dyn FrameAnnotator>,
    store: Arc<dyn ResultStore>,
    logger: Box<dyn PipelineLogger>,
    config: ProcessingConfig,
    on_progress: Option<ProgressFn>,
}

impl ProcessVideoUseCase {
    pub fn new(
        reader: Box<dyn VideoReader>,
        writer: Box<dyn VideoWriter>,
        detector: Box<dyn FaceDetector>,
        annotator: Box<dyn FrameAnnotator>,
        store: Arc<dyn ResultStore>,
        config: ProcessingConfig,
    ) -> Self {
        Self {
            reader,
            writer,
            detector,
            annotator,
            store,
            logger: Box::new(NullPipelineLogger),
            config,
            on_progress: None,
        }
    }

    pub fn with_logger(mut self, logger: Box<dyn PipelineLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_progress(mut self, on_progress: ProgressFn) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn execute(mut self, input: &Path, output: &Path) -> Result<ProcessingReport, ProcessError> {
        self.config.validate()?;

        let run_id = RunId::generate();
        let metadata = self
            .reader
            .open(input)
            .map_err(|source| ProcessError::Input {
                path: input.to_path_buf(),
                source,
            })?;
        self.logger.info(&format!(
            "Run {run_id}: {} ({}x{}, {:.2} fps)",
            input.display(),
            metadata.width,
            metadata.height,
            metadata.fps
        ));

        let partial = partial_path(output);
        if let Err(source) = self.writer.open(&partial, &metadata) {
            self.reader.close();
            discard(&partial);
            return Err(ProcessError::Output {
                path: output.to_path_buf(),
                source,
            });
        }

        let outcome = self
            .run_frames(&run_id, &metadata, input, output)
            .and_then(|outcome| {
                self.writer.close().map_err(|source| ProcessError::Output {
                    path: output.to_path_buf(),
                    source,
                })?;
                fs::rename(&partial, output).map_err(|e| ProcessError::Output {
                    path: output.to_path_buf(),
                    source: Box::new(e),
                })?;
                Ok(outcome)
            });
        self.reader.close();

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                if let Err(close_err) = self.writer.close() {
                    log::debug!("Closing writer after failure: {close_err}");
                }
                discard(&partial);
                log::error!("Run {run_id} failed: {e}");
                return Err(e);
            }
        };
        self.logger.summary();

        let (persons, unpersisted) = persist(self.store.as_ref(), outcome.pending);
        log::info!(
            "Run {run_id} finished: {} frames, {} persons, {} detection failures",
            outcome.frames_processed,
            persons.len(),
            outcome.detection_failures
        );

        Ok(ProcessingReport {
            run_id,
            output_video: output.to_path_buf(),
            frames_processed: outcome.frames_processed,
            detection_failures: outcome.detection_failures,
            persons,
            unpersisted,
        })
    }

    fn run_frames(
        &mut self,
        run_id: &RunId,
        metadata: &VideoMetadata,
        input: &Path,
        output: &Path,
    ) -> Result<FrameLoopOutcome, ProcessError> {
        let mut tracker = Tracker::new(self.config.tracker_config());
        let mut outcome = FrameLoopOutcome {
            frames_processed: 0,
            detection_failures: 0,
            pending: Vec::new(),
        };
        let total = metadata.total_frames;
        let output_err = |source| ProcessError::Output {
            path: output.to_path_buf(),
            source,
        };

        let mut frames = self.reader.frames();
        loop {
            let t = Instant::now();
            let Some(item) = frames.next() else {
                break;
            };
            let frame = item.map_err(|source| ProcessError::Input {
                path: input.to_path_buf(),
                source,
            })?;
            self.logger.timing("decode", elapsed_ms(t));

            let t = Instant::now();
            let detections = match self.detector.detect(&frame) {
                Ok(detections) => detections,
                Err(e) => {
                    log::warn!("Detection failed on frame {}: {e}", frame.index());
                    outcome.detection_failures += 1;
                    Vec::new()
                }
            };
            self.logger.timing("detect", elapsed_ms(t));
            self.logger.metric("detections", detections.len() as f64);

            let t = Instant::now();
            let update = tracker.update(&detections, frame.index());
            for c in update.confirmations {
                let id = PersonId::new(run_id.clone(), c.track_id);
                log::info!("Person {id} confirmed as {} at frame {}", c.label, frame.index());
                outcome.pending.push(PendingPerson {
                    record: PersonRecord {
                        id,
                        image: None,
                        gender: c.label.gender,
                        age: c.label.age,
                        entry_time: c.first_seen,
                        first_frame: c.first_frame,
                    },
                    crop: frame.crop(&c.bbox),
                });
            }
            self.logger.timing("track", elapsed_ms(t));
            self.logger
                .metric("live_tracks", tracker.tracks().len() as f64);

            let t = Instant::now();
            let overlays: Vec<TrackOverlay> =
                tracker.tracks().iter().map(TrackOverlay::from).collect();
            let annotated = self
                .annotator
                .annotate(frame, &overlays)
                .map_err(output_err)?;
            self.logger.timing("annotate", elapsed_ms(t));

            let t = Instant::now();
            self.writer.write(&annotated).map_err(output_err)?;
            self.logger.timing("encode", elapsed_ms(t));

            outcome.frames_processed += 1;
            self.logger.progress(outcome.frames_processed, total);
            if let Some(on_progress) = self.on_progress.as_mut() {
                if !on_progress(outcome.frames_processed, total) {
                    log::info!("Run {run_id} cancelled after {} frames", outcome.frames_processed);
                    return Err(ProcessError::Cancelled);
                }
            }
        }

        Ok(outcome)
    }
}

/// Saves crop then record for every pending person. A person whose crop
/// fails is still recorded, without an image, and reported as unpersisted.
fn persist(
    store: &dyn ResultStore,
    pending: Vec<PendingPerson>,
) -> (Vec<PersonRecord>, Vec<PersonId>) {
    let mut persons = Vec::with_capacity(pending.len());
    let mut unpersisted = Vec::new();

    for PendingPerson { mut record, crop } in pending {
        let mut saved = true;
        match store.put_face_crop(&record.id, &crop) {
            Ok(reference) => record.image = Some(reference),
            Err(e) => {
                log::warn!("Could not save face crop for {}: {e}", record.id);
                saved = false;
            }
        }
        if let Err(e) = store.put_record(&record) {
            log::warn!("Could not save record {}: {e}", record.id);
            saved = false;
        }
        if !saved {
            unpersisted.push(record.id.clone());
        }
        persons.push(record);
    }

    sort_records(&mut persons);
    (persons, unpersisted)
}

/// Hidden sibling of `output` that the encoder writes to:
/// `dir/clip.mp4` becomes `dir/.clip.partial.mp4`.
pub fn partial_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match output.extension() {
        Some(ext) => format!(".{stem}.partial.{}", ext.to_string_lossy()),
        None => format!(".{stem}.partial"),
    };
    output.with_file_name(name)
}

fn discard(partial: &Path) {
    match fs::remove_file(partial) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => log::warn!("Could not remove {}: {e}", partial.display()),
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::domain::result_store::StoreError;
    use crate::catalog::infrastructure::in_memory_result_store::InMemoryResultStore;
    use crate::detection::domain::detection::Detection;
    use crate::pipeline::error::ConfigError;
    use crate::shared::bounding_box::BoundingBox;
    use crate::shared::labels::{Gender, Prediction};
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;
    use tempfile::TempDir;

    // --- Stubs ---

    struct StubReader {
        frames: Vec<Result<Frame, String>>,
        opened: Arc<Mutex<bool>>,
        closed: Arc<Mutex<bool>>,
    }

    impl StubReader {
        fn new(frames: Vec<Result<Frame, String>>) -> Self {
            Self {
                frames,
                opened: Arc::new(Mutex::new(false)),
                closed: Arc::new(Mutex::new(false)),
            }
        }

        fn blank(count: usize) -> Self {
            Self::new(
                (0..count)
                    .map(|i| Ok(Frame::filled(100, 100, [90, 90, 90], i)))
                    .collect(),
            )
        }
    }

    impl VideoReader for StubReader {
        fn open(&mut self, _path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
            *self.opened.lock().unwrap() = true;
            Ok(VideoMetadata {
                width: 100,
                height: 100,
                fps: 25.0,
                total_frames: self.frames.len(),
                source_path: None,
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new(self.frames.drain(..).map(|f| f.map_err(|e| e.into())))
        }

        fn close(&mut self) {
            *self.closed.lock().unwrap() = true;
        }
    }

    /// Creates the file it is pointed at so the final rename has something
    /// to move.
    struct StubWriter {
        written: Arc<Mutex<Vec<Frame>>>,
        opened_at: Arc<Mutex<Option<PathBuf>>>,
    }

    impl StubWriter {
        fn new() -> Self {
            Self {
                written: Arc::new(Mutex::new(Vec::new())),
                opened_at: Arc::new(Mutex::new(None)),
            }
        }
    }

    impl VideoWriter for StubWriter {
        fn open(
            &mut self,
            path: &Path,
            _metadata: &VideoMetadata,
        ) -> Result<(), Box<dyn std::error::Error>> {
            fs::write(path, b"video")?;
            *self.opened_at.lock().unwrap() = Some(path.to_path_buf());
            Ok(())
        }

        fn write(&mut self, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
            self.written.lock().unwrap().push(frame.clone());
            Ok(())
        }

        fn close(&mut self) -> Result<(), Box<dyn std::error::Error>> {
            Ok(())
        }
    }

    /// Returns scripted detections per frame index; listed frames fail.
    struct ScriptedDetector {
        script: HashMap<usize, Vec<Detection>>,
        failing: HashSet<usize>,
    }

    impl FaceDetector for ScriptedDetector {
        fn detect(&mut self, frame: &Frame) -> Result<Vec<Detection>, Box<dyn std::error::Error>> {
            if self.failing.contains(&frame.index()) {
                return Err("model exploded".into());
            }
            Ok(self.script.get(&frame.index()).cloned().unwrap_or_default())
        }
    }

    #[derive(Clone, Default)]
    struct RecordingAnnotator {
        overlays: Arc<Mutex<Vec<Vec<TrackOverlay>>>>,
    }

    impl FrameAnnotator for RecordingAnnotator {
        fn annotate(
            &mut self,
            frame: Frame,
            overlays: &[TrackOverlay],
        ) -> Result<Frame, Box<dyn std::error::Error>> {
            self.overlays.lock().unwrap().push(overlays.to_vec());
            Ok(frame)
        }
    }

    /// In-memory store that counts crop writes and can be told to fail.
    #[derive(Default)]
    struct TestStore {
        inner: InMemoryResultStore,
        crop_calls: Mutex<Vec<PersonId>>,
        fail_crops: bool,
        fail_records: bool,
    }

    fn refused() -> StoreError {
        StoreError::Io {
            path: PathBuf::from("/readonly"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only"),
        }
    }

    impl ResultStore for TestStore {
        fn put_record(&self, record: &PersonRecord) -> Result<(), StoreError> {
            if self.fail_records {
                return Err(refused());
            }
            self.inner.put_record(record)
        }

        fn get_record(&self, id: &PersonId) -> Result<PersonRecord, StoreError> {
            self.inner.get_record(id)
        }

        fn put_face_crop(&self, id: &PersonId, crop: &Frame) -> Result<String, StoreError> {
            self.crop_calls.lock().unwrap().push(id.clone());
            if self.fail_crops {
                return Err(refused());
            }
            self.inner.put_face_crop(id, crop)
        }

        fn get_face_crop(&self, id: &PersonId) -> Result<Frame, StoreError> {
            self.inner.get_face_crop(id)
        }

        fn list_records(&self) -> Result<Vec<PersonRecord>, StoreError> {
            self.inner.list_records()
        }

        fn clear_all(&self) -> Result<(), StoreError> {
            self.inner.clear_all()
        }
    }

    // --- Helpers ---

    fn face(bbox: BoundingBox, gender: Gender, age: &str) -> Detection {
        Detection::new(bbox, Prediction::new(age, gender), 0.9)
    }

    fn fixed_box() -> BoundingBox {
        BoundingBox::new(20, 20, 60, 60)
    }

    struct Harness {
        dir: TempDir,
        written: Arc<Mutex<Vec<Frame>>>,
        overlays: Arc<Mutex<Vec<Vec<TrackOverlay>>>>,
        store: Arc<TestStore>,
        opened: Arc<Mutex<bool>>,
        closed: Arc<Mutex<bool>>,
        opened_at: Arc<Mutex<Option<PathBuf>>>,
    }

    impl Harness {
        fn output(&self) -> PathBuf {
            self.dir.path().join("out.mp4")
        }

        fn partial(&self) -> PathBuf {
            partial_path(&self.output())
        }
    }

    fn build(
        reader: StubReader,
        detector: ScriptedDetector,
        store: TestStore,
        config: ProcessingConfig,
    ) -> (ProcessVideoUseCase, Harness) {
        let writer = StubWriter::new();
        let annotator = RecordingAnnotator::default();
        let store = Arc::new(store);
        let harness = Harness {
            dir: TempDir::new().unwrap(),
            written: writer.written.clone(),
            overlays: annotator.overlays.clone(),
            store: store.clone(),
            opened: reader.opened.clone(),
            closed: reader.closed.clone(),
            opened_at: writer.opened_at.clone(),
        };
        let use_case = ProcessVideoUseCase::new(
            Box::new(reader),
            Box::new(writer),
            Box::new(detector),
            Box::new(annotator),
            store,
            config,
        );
        (use_case, harness)
    }

    fn run(use_case: ProcessVideoUseCase, h: &Harness) -> Result<ProcessingReport, ProcessError> {
        use_case.execute(Path::new("in.mp4"), &h.output())
    }

    /// One face at a fixed box; raw labels Male, Male, Female, then Male.
    fn single_face_script(frames: usize) -> ScriptedDetector {
        let mut script = HashMap::new();
        for i in 0..frames {
            let det = match i {
                2 => face(fixed_box(), Gender::Female, "(38-43)"),
                _ => face(fixed_box(), Gender::Male, "(25-32)"),
            };
            script.insert(i, vec![det]);
        }
        ScriptedDetector {
            script,
            failing: HashSet::new(),
        }
    }

    // --- Tests ---

    #[test]
    fn test_single_face_end_to_end() {
        let (use_case, h) = build(
            StubReader::blank(10),
            single_face_script(10),
            TestStore::default(),
            ProcessingConfig::default(),
        );
        let report = run(use_case, &h).unwrap();

        assert_eq!(report.frames_processed, 10);
        assert_eq!(report.detection_failures, 0);
        assert_eq!(report.persons.len(), 1);
        assert!(report.unpersisted.is_empty());

        let person = &report.persons[0];
        assert_eq!(person.id.run, report.run_id);
        assert_eq!(person.id.track, 1);
        assert_eq!(person.gender, Gender::Male);
        assert_eq!(person.age.as_str(), "(25-32)");
        assert_eq!(person.first_frame, 0);
        assert!(person.image.is_some());

        let stored = h.store.list_records().unwrap();
        assert_eq!(stored, report.persons);
        let crop = h.store.get_face_crop(&person.id).unwrap();
        assert_eq!((crop.width(), crop.height()), (40, 40));
    }

    #[test]
    fn test_output_is_renamed_into_place() {
        let (use_case, h) = build(
            StubReader::blank(3),
            single_face_script(3),
            TestStore::default(),
            ProcessingConfig::default(),
        );
        let report = run(use_case, &h).unwrap();

        assert_eq!(report.output_video, h.output());
        assert!(h.output().exists());
        assert!(!h.partial().exists());
        assert_eq!(h.written.lock().unwrap().len(), 3);
        assert!(*h.closed.lock().unwrap());
    }

    #[test]
    fn test_frames_written_in_order() {
        let (use_case, h) = build(
            StubReader::blank(6),
            single_face_script(6),
            TestStore::default(),
            ProcessingConfig::default(),
        );
        run(use_case, &h).unwrap();

        let indices: Vec<usize> = h.written.lock().unwrap().iter().map(|f| f.index()).collect();
        assert_eq!(indices, (0..6).collect::<Vec<_>>());
    }

    #[test]
    fn test_overlays_show_raw_label_until_confirmed() {
        let (use_case, h) = build(
            StubReader::blank(4),
            single_face_script(4),
            TestStore::default(),
            ProcessingConfig::default(),
        );
        run(use_case, &h).unwrap();

        let overlays = h.overlays.lock().unwrap();
        let male = Prediction::new("(25-32)", Gender::Male);
        assert!(!overlays[0][0].confirmed);
        assert!(!overlays[1][0].confirmed);
        assert_eq!(overlays[1][0].label, male);
        // Frame 2's raw label is Female but it completes the window
        assert!(overlays[2][0].confirmed);
        assert_eq!(overlays[2][0].label, male);
        assert_eq!(overlays[3][0].label, male);
    }

    #[test]
    fn test_detector_failure_counts_as_no_faces() {
        let mut detector = single_face_script(6);
        detector.failing.insert(2);
        let (use_case, h) = build(
            StubReader::blank(6),
            detector,
            TestStore::default(),
            ProcessingConfig::default(),
        );
        let report = run(use_case, &h).unwrap();

        assert_eq!(report.frames_processed, 6);
        assert_eq!(report.detection_failures, 1);
        // The track survives the missed frame and confirms on frame 3
        let live: Vec<usize> = h.overlays.lock().unwrap().iter().map(|o| o.len()).collect();
        assert_eq!(live, vec![1; 6]);
        assert_eq!(report.persons.len(), 1);
        assert_eq!(report.persons[0].gender, Gender::Male);
    }

    #[test]
    fn test_decode_failure_leaves_no_output_and_no_catalog() {
        let mut frames: Vec<Result<Frame, String>> = (0..3)
            .map(|i| Ok(Frame::filled(100, 100, [0, 0, 0], i)))
            .collect();
        frames.push(Err("corrupt packet".into()));
        let config = ProcessingConfig {
            frames_to_stabilize: 2,
            ..ProcessingConfig::default()
        };
        let (use_case, h) = build(
            StubReader::new(frames),
            single_face_script(4),
            TestStore::default(),
            config,
        );
        let err = run(use_case, &h).unwrap_err();

        assert!(matches!(err, ProcessError::Input { .. }));
        assert!(err.to_string().contains("corrupt packet"));
        assert!(!h.output().exists());
        assert!(!h.partial().exists());
        assert!(h.store.list_records().unwrap().is_empty());
        assert!(h.store.crop_calls.lock().unwrap().is_empty());
        assert!(*h.closed.lock().unwrap());
    }

    #[test]
    fn test_invalid_config_rejected_before_opening() {
        let config = ProcessingConfig {
            conf_threshold: 2.0,
            ..ProcessingConfig::default()
        };
        let (use_case, h) = build(
            StubReader::blank(2),
            single_face_script(2),
            TestStore::default(),
            config,
        );
        let err = run(use_case, &h).unwrap_err();

        assert!(matches!(
            err,
            ProcessError::Config(ConfigError::OutOfUnitRange { .. })
        ));
        assert!(!*h.opened.lock().unwrap());
    }

    #[test]
    fn test_record_failure_is_reported_not_fatal() {
        let store = TestStore {
            fail_records: true,
            ..TestStore::default()
        };
        let (use_case, h) = build(
            StubReader::blank(5),
            single_face_script(5),
            store,
            ProcessingConfig::default(),
        );
        let report = run(use_case, &h).unwrap();

        assert_eq!(report.persons.len(), 1);
        assert_eq!(report.unpersisted, vec![report.persons[0].id.clone()]);
        assert!(h.output().exists());
    }

    #[test]
    fn test_crop_failure_keeps_record_without_image() {
        let store = TestStore {
            fail_crops: true,
            ..TestStore::default()
        };
        let (use_case, h) = build(
            StubReader::blank(5),
            single_face_script(5),
            store,
            ProcessingConfig::default(),
        );
        let report = run(use_case, &h).unwrap();

        let id = report.persons[0].id.clone();
        assert_eq!(report.unpersisted, vec![id.clone()]);
        assert_eq!(h.store.get_record(&id).unwrap().image, None);
    }

    #[test]
    fn test_exactly_one_crop_per_confirmed_track() {
        let left = BoundingBox::new(0, 0, 30, 30);
        let right = BoundingBox::new(60, 60, 95, 95);
        let script = (0..8)
            .map(|i| {
                (
                    i,
                    vec![
                        face(left, Gender::Female, "(8-12)"),
                        face(right, Gender::Male, "(60-100)"),
                    ],
                )
            })
            .collect();
        let detector = ScriptedDetector {
            script,
            failing: HashSet::new(),
        };
        let (use_case, h) = build(
            StubReader::blank(8),
            detector,
            TestStore::default(),
            ProcessingConfig::default(),
        );
        let report = run(use_case, &h).unwrap();

        assert_eq!(report.persons.len(), 2);
        let mut calls = h.store.crop_calls.lock().unwrap().clone();
        calls.sort();
        let mut ids: Vec<PersonId> = report.persons.iter().map(|p| p.id.clone()).collect();
        ids.sort();
        assert_eq!(calls, ids);
    }

    #[test]
    fn test_stale_track_dropped_but_person_kept() {
        let mut script = HashMap::new();
        for i in 0..4 {
            script.insert(i, vec![face(fixed_box(), Gender::Female, "(15-20)")]);
        }
        let detector = ScriptedDetector {
            script,
            failing: HashSet::new(),
        };
        let config = ProcessingConfig {
            max_track_age: 2,
            ..ProcessingConfig::default()
        };
        let (use_case, h) = build(StubReader::blank(10), detector, TestStore::default(), config);
        let report = run(use_case, &h).unwrap();

        let live: Vec<usize> = h.overlays.lock().unwrap().iter().map(|o| o.len()).collect();
        assert_eq!(live, vec![1, 1, 1, 1, 1, 1, 0, 0, 0, 0]);
        assert_eq!(report.persons.len(), 1);
        assert_eq!(report.persons[0].gender, Gender::Female);
    }

    #[test]
    fn test_progress_reports_every_frame() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let (use_case, h) = build(
            StubReader::blank(4),
            single_face_script(4),
            TestStore::default(),
            ProcessingConfig::default(),
        );
        let use_case = use_case.with_progress(Box::new(move |current, total| {
            sink.lock().unwrap().push((current, total));
            true
        }));
        run(use_case, &h).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![(1, 4), (2, 4), (3, 4), (4, 4)]);
    }

    #[test]
    fn test_cancellation_is_atomic() {
        let (use_case, h) = build(
            StubReader::blank(10),
            single_face_script(10),
            TestStore::default(),
            ProcessingConfig::default(),
        );
        let use_case = use_case.with_progress(Box::new(|current, _| current < 5));
        let err = run(use_case, &h).unwrap_err();

        assert!(matches!(err, ProcessError::Cancelled));
        assert_eq!(h.written.lock().unwrap().len(), 5);
        assert!(!h.output().exists());
        assert!(!h.partial().exists());
        assert!(h.store.list_records().unwrap().is_empty());
    }

    #[test]
    fn test_empty_video_produces_empty_report() {
        let (use_case, h) = build(
            StubReader::blank(0),
            single_face_script(0),
            TestStore::default(),
            ProcessingConfig::default(),
        );
        let report = run(use_case, &h).unwrap();

        assert_eq!(report.frames_processed, 0);
        assert!(report.persons.is_empty());
        assert!(h.output().exists());
    }

    #[test]
    fn test_runs_use_distinct_id_namespaces() {
        let store = Arc::new(InMemoryResultStore::new());
        let mut runs = Vec::new();
        for _ in 0..2 {
            let dir = TempDir::new().unwrap();
            let use_case = ProcessVideoUseCase::new(
                Box::new(StubReader::blank(4)),
                Box::new(StubWriter::new()),
                Box::new(single_face_script(4)),
                Box::new(RecordingAnnotator::default()),
                store.clone(),
                ProcessingConfig::default(),
            );
            runs.push(
                use_case
                    .execute(Path::new("in.mp4"), &dir.path().join("out.mp4"))
                    .unwrap(),
            );
        }

        assert_ne!(runs[0].run_id, runs[1].run_id);
        assert_eq!(store.list_records().unwrap().len(), 2);
    }

    #[test]
    fn test_writer_targets_hidden_partial_file() {
        let (use_case, h) = build(
            StubReader::blank(1),
            single_face_script(1),
            TestStore::default(),
            ProcessingConfig::default(),
        );
        run(use_case, &h).unwrap();
        assert_eq!(
            *h.opened_at.lock().unwrap(),
            Some(h.dir.path().join(".out.partial.mp4"))
        );
    }

    #[test]
    fn test_partial_path_without_extension() {
        assert_eq!(
            partial_path(Path::new("/tmp/clip")),
            PathBuf::from("/tmp/.clip.partial")
        );
    }

    #[test]
    fn test_report_serializes_to_json() {
        let (use_case, h) = build(
            StubReader::blank(3),
            single_face_script(3),
            TestStore::default(),
            ProcessingConfig::default(),
        );
        let report = run(use_case, &h).unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["run_id"], report.run_id.as_str());
        assert_eq!(json["frames_processed"], 3);
        assert_eq!(json["persons"].as_array().unwrap().len(), 1);
    }
}
