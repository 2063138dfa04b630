//! Fixed catalog of the extraction jobs the clustering suite consumes.

use crate::dataset::Dataset;
use crate::job::SpeakerJob;

/// All catalog jobs, in the order they are run.
///
/// The 40-speaker TIMIT list is used twice: once unsplit for clustering and
/// once split into training and test bundles.
pub fn all_jobs() -> Vec<SpeakerJob> {
    vec![
        SpeakerJob::new(false, 100, "speakers_voxceleb_speaker_diarization_100")
            .with_dataset(Dataset::VoxCeleb)
            .with_max_audio_length(800)
            .with_sentences(45),
        SpeakerJob::new(false, 19, "speakers_rt09_speaker_diarization")
            .with_dataset(Dataset::Rt09)
            .with_max_audio_length(881)
            .with_sentences(15),
        SpeakerJob::new(false, 40, "speakers_40_clustering_vs_reynolds"),
        SpeakerJob::new(false, 100, "speakers_100_50w_50m_not_reynolds"),
        SpeakerJob::new(true, 40, "speakers_40_clustering_vs_reynolds"),
        SpeakerJob::new(true, 60, "speakers_60_clustering"),
        SpeakerJob::new(true, 80, "speakers_80_clustering"),
        SpeakerJob::new(true, 590, "speakers_590_clustering_without_raynolds"),
    ]
}

/// Jobs whose output name or one of whose output file names equals `name`.
pub fn find_jobs(name: &str) -> Vec<SpeakerJob> {
    all_jobs()
        .into_iter()
        .filter(|job| job.output_name() == name || job.output_names().iter().any(|n| n == name))
        .collect()
}
