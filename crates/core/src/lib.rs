//! Face tracking and age/gender stabilization for recorded video.
//!
//! A run decodes a video, detects faces per frame, associates them into
//! tracks, freezes one age/gender label per track once enough observations
//! agree, and emits a catalog of the persons seen plus an annotated copy of
//! the video.

pub mod shared {
    pub mod bounding_box;
    pub mod constants;
    pub mod frame;
    pub mod labels;
    pub mod model_resolver;
    pub mod video_metadata;
}

pub mod detection {
    pub mod domain {
        pub mod age_gender_classifier;
        pub mod age_gender_detector;
        pub mod detection;
        pub mod face_detector;
        pub mod face_locator;
    }
    pub mod infrastructure;
}

pub mod tracking {
    pub mod domain {
        pub mod stabilizer;
        pub mod track;
        pub mod tracker;
    }
}

pub mod catalog {
    pub mod domain {
        pub mod person_record;
        pub mod result_store;
    }
    pub mod infrastructure;
}

pub mod annotation {
    pub mod domain {
        pub mod frame_annotator;
    }
    pub mod infrastructure;
}

pub mod video {
    pub mod domain {
        pub mod video_reader;
        pub mod video_writer;
    }
    pub mod infrastructure;
}

pub mod pipeline {
    pub mod error;
    pub mod pipeline_logger;
    pub mod process_video_use_case;
    pub mod processing_config;
}
