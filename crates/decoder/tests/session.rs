use anyhow::Result;
use nmtbench_checkpoint::{CheckpointPool, LanguageRule};
use nmtbench_decoder::weights::WEIGHTS_FILE;
use nmtbench_decoder::{
    CheckpointData, CheckpointEntry, DecoderSession, DecoderSettings, DeviceInfo, DeviceInventory,
    ModelConfig, SessionError, Suggestion, TranslateError, TranslationRequest, Translator,
};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const EN_IT: &[(&str, &str)] = &[("and", "e"), ("the", "il"), ("cat", "gatto"), ("also", "ed")];
const EN_DE: &[(&str, &str)] = &[("and", "und"), ("the", "die"), ("cat", "Katze")];

fn write_model(dir: &Path, checkpoints: &[(&str, &[(&str, &str)])]) -> Result<ModelConfig> {
    let mut entries = Vec::new();
    for (name, pairs) in checkpoints {
        CheckpointData::lexicon(pairs).save(dir.join(name))?;
        entries.push(CheckpointEntry::new(*name, *name));
    }
    ModelConfig::new(entries, DecoderSettings::default()).save(dir.join("model.json"))?;
    Ok(ModelConfig::load(dir)?)
}

fn open_session(checkpoints: &[(&str, &[(&str, &str)])]) -> Result<(TempDir, DecoderSession)> {
    let dir = tempfile::tempdir()?;
    let config = write_model(dir.path(), checkpoints)?;
    let pool = config.checkpoint_pool()?;
    let session = DecoderSession::construct(&DeviceInventory::host_only(), 0, pool, config)?;
    Ok((dir, session))
}

#[test]
fn pool_matches_registrations() -> Result<()> {
    let (_dir, session) = open_session(&[("en__it", EN_IT), ("en__de", EN_DE)])?;
    assert_eq!(session.pool().len(), 2);
    assert_eq!(
        session.pool().names(),
        ["en__it", "en__de"].into_iter().collect()
    );
    assert_eq!(session.last_checkpoint(), Some("en__it"));
    assert_eq!(session.stats().reloads, 1);
    Ok(())
}

#[test]
fn translates_and_with_valid_alignment() -> Result<()> {
    let (_dir, mut session) = open_session(&[("en__it", EN_IT)])?;
    let result = session.translate("en", "it", "and", &[])?;

    assert_eq!(result.text, "e");
    assert_eq!(result.checkpoint, "en__it");
    let source_len = 1;
    let target_len = result.text.split_whitespace().count();
    assert!(!result.alignment.is_empty());
    assert_eq!(result.scores.len(), target_len);
    assert!(result.scores.iter().all(|p| *p > 0.0 && *p <= 1.0));
    assert!(result
        .alignment
        .iter()
        .all(|&(s, t)| s < source_len && t < target_len));
    Ok(())
}

#[test]
fn repeated_calls_stay_warm() -> Result<()> {
    let (_dir, mut session) = open_session(&[("en__it", EN_IT)])?;
    for _ in 0..3 {
        let result = session.translate("en", "it", "the cat", &[])?;
        assert!(!result.timings.is_cold());
    }
    assert_eq!(session.stats().reloads, 1);
    assert_eq!(session.stats().translations, 3);
    Ok(())
}

#[test]
fn force_reset_reloads_same_pair() -> Result<()> {
    let (_dir, mut session) = open_session(&[("en__it", EN_IT)])?;
    session.translate("en", "it", "and", &[])?;

    session.force_reset();
    assert!(session.needs_reset());
    assert_eq!(session.last_checkpoint(), None);

    let result = session.translate("en", "it", "and", &[])?;
    assert!(result.timings.is_cold());
    assert_eq!(session.stats().reloads, 2);
    assert!(!session.needs_reset());
    Ok(())
}

#[test]
fn switching_pairs_reloads() -> Result<()> {
    let (_dir, mut session) = open_session(&[("en__it", EN_IT), ("en__de", EN_DE)])?;
    assert_eq!(session.translate("en", "de", "the cat", &[])?.text, "die Katze");
    assert_eq!(session.last_checkpoint(), Some("en__de"));
    assert_eq!(session.translate("en", "it", "the cat", &[])?.text, "il gatto");
    assert_eq!(session.stats().reloads, 3);
    Ok(())
}

#[test]
fn regional_request_falls_back_to_plain_checkpoint() -> Result<()> {
    let (_dir, mut session) = open_session(&[("en__it", EN_IT)])?;
    let result = session.translate("en-US", "it_CH", "cat", &[])?;
    assert_eq!(result.text, "gatto");
    Ok(())
}

#[test]
fn unsupported_pair_is_rejected() -> Result<()> {
    let (_dir, mut session) = open_session(&[("en__it", EN_IT)])?;
    let err = session.translate("it", "en", "e", &[]).unwrap_err();
    assert!(matches!(
        err,
        TranslateError::UnsupportedLanguagePair { ref source_lang, ref target_lang }
            if source_lang == "it" && target_lang == "en"
    ));
    Ok(())
}

#[test]
fn empty_input_keeps_pending_reset() -> Result<()> {
    let (_dir, mut session) = open_session(&[("en__it", EN_IT)])?;
    session.force_reset();

    assert!(matches!(
        session.translate("en", "it", "   ", &[]),
        Err(TranslateError::EmptyInput)
    ));
    assert!(session.needs_reset());
    assert_eq!(session.stats().reloads, 1);
    Ok(())
}

#[test]
fn overlong_input_is_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    CheckpointData::lexicon(EN_IT).save(dir.path().join("en__it"))?;
    let settings = DecoderSettings {
        max_input_tokens: 2,
        ..DecoderSettings::default()
    };
    let config = ModelConfig::new(vec![CheckpointEntry::new("en__it", "en__it")], settings);
    config.save(dir.path().join("model.json"))?;
    let config = ModelConfig::load(dir.path())?;
    let pool = config.checkpoint_pool()?;
    let mut session = DecoderSession::construct(&DeviceInventory::host_only(), 0, pool, config)?;

    assert!(matches!(
        session.translate("en", "it", "the cat and", &[]),
        Err(TranslateError::InputTooLong { tokens: 3, limit: 2 })
    ));
    Ok(())
}

#[test]
fn suggestions_for_other_pairs_are_ignored() -> Result<()> {
    let (_dir, mut session) = open_session(&[("en__it", EN_IT)])?;
    let matching = Suggestion::new("en", "it", "and", "ed", 1.0);
    let other = Suggestion::new("en", "de", "and", "ed", 1.0);

    assert_eq!(session.translate("en", "it", "and", &[other])?.text, "e");
    assert_eq!(session.translate("en", "it", "and", &[matching])?.text, "ed");
    Ok(())
}

#[test]
fn translator_trait_forwards_requests() -> Result<()> {
    let (_dir, mut session) = open_session(&[("en__it", EN_IT)])?;
    let translator: &mut dyn Translator = &mut session;
    translator.force_reset();
    let result = translator.translate(&TranslationRequest::new("en", "it", "and"))?;
    assert!(result.timings.is_cold());
    Ok(())
}

#[test]
fn invalid_device_index_is_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = write_model(dir.path(), &[("en__it", EN_IT)])?;
    let pool = config.checkpoint_pool()?;
    let inventory = DeviceInventory::new(vec![DeviceInfo::cuda(0), DeviceInfo::cuda(1)]);

    let err = DecoderSession::construct(&inventory, 4, pool, config)
        .err()
        .expect("device 4 does not exist");
    assert!(matches!(
        err,
        SessionError::DeviceUnavailable {
            index: 4,
            available: 2
        }
    ));
    Ok(())
}

#[test]
fn corrupt_initial_checkpoint_fails_construction() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = write_model(dir.path(), &[("en__it", EN_IT)])?;
    fs::write(dir.path().join("en__it").join(WEIGHTS_FILE), b"not safetensors")?;
    let pool = config.checkpoint_pool()?;

    let err = DecoderSession::construct(&DeviceInventory::host_only(), 0, pool, config)
        .err()
        .expect("weights are corrupt");
    assert!(matches!(err, SessionError::CheckpointLoad { ref name, .. } if name == "en__it"));
    Ok(())
}

#[test]
fn checkpoint_removed_after_reset_surfaces_as_load_error() -> Result<()> {
    let (dir, mut session) = open_session(&[("en__it", EN_IT)])?;
    fs::remove_file(dir.path().join("en__it").join(WEIGHTS_FILE))?;

    // warm path never touches disk
    session.translate("en", "it", "and", &[])?;

    session.force_reset();
    assert!(matches!(
        session.translate("en", "it", "and", &[]),
        Err(TranslateError::CheckpointLoad { .. })
    ));
    Ok(())
}

#[test]
fn pool_can_be_built_without_a_config() -> Result<()> {
    let dir = tempfile::tempdir()?;
    CheckpointData::lexicon(EN_IT).save(dir.path().join("en__it"))?;
    let mut builder = CheckpointPool::builder();
    builder.register("en__it", dir.path().join("en__it"))?;
    let pool = builder.build()?;

    let config = ModelConfig::new(
        vec![CheckpointEntry::new("en__it", dir.path().join("en__it"))],
        DecoderSettings::default(),
    );
    let mut session = DecoderSession::construct(&DeviceInventory::host_only(), 0, pool, config)?;
    assert_eq!(session.translate("en", "it", "cat", &[])?.text, "gatto");
    Ok(())
}

#[test]
fn reversed_suggestions_are_flipped() -> Result<()> {
    let (_dir, mut session) = open_session(&[("en__it", EN_IT)])?;
    let reversed = Suggestion::new("it", "en", "ed", "and", 1.0);
    assert_eq!(session.translate("en", "it", "and", &[reversed])?.text, "ed");
    Ok(())
}

#[test]
fn language_rules_from_config_route_requests() -> Result<()> {
    let dir = tempfile::tempdir()?;
    CheckpointData::lexicon(&[("cat", "mao")]).save(dir.path().join("en__zh-CN"))?;
    let rule = LanguageRule::new("zh".parse()?, "zh-CN".parse()?);
    ModelConfig::new(
        vec![CheckpointEntry::new("en__zh-CN", "en__zh-CN")],
        DecoderSettings::default(),
    )
    .with_language_rules(vec![rule])
    .save(dir.path().join("model.json"))?;

    let config = ModelConfig::load(dir.path())?;
    let pool = config.checkpoint_pool()?;
    let mut session = DecoderSession::construct(&DeviceInventory::host_only(), 0, pool, config)?;

    assert_eq!(session.translate("en", "zh", "cat", &[])?.text, "mao");
    assert!(matches!(
        session.translate("it", "en", "gatto", &[]),
        Err(TranslateError::UnsupportedLanguagePair { .. })
    ));
    Ok(())
}

#[test]
fn loaded_checkpoint_tracks_resets() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let config = write_model(dir.path(), &[("en__it", EN_IT), ("en__de", EN_DE)])?;
    let pool = config.checkpoint_pool()?;
    let mut session = DecoderSession::construct(&DeviceInventory::host_only(), 0, pool, config)?;

    let loaded = session.loaded_checkpoint().map(|c| c.path().to_path_buf());
    assert_eq!(loaded, Some(dir.path().join("en__it")));

    session.translate("en", "de", "cat", &[])?;
    assert_eq!(session.loaded_checkpoint().map(|c| c.name()), Some("en__de"));

    session.force_reset();
    assert!(session.loaded_checkpoint().is_none());
    Ok(())
}
