//! End-to-end editing scenarios through an [`EditSession`]

use fomod_common::Settings;
use fomod_editor::{
    EditSession, EditorError, EditorEvent, PreviewDispatcher, PreviewRenderer, PreviewSnapshot,
    DEFAULT_UNDO_LEVELS,
};
use fomod_parser::{NodeId, NodeKind, Tree, TreeError, Violation};
use std::sync::mpsc::{channel, Sender};
use std::time::Duration;

/// Add the chain of nodes leading from the config root down to a plugin
fn add_plugin(session: &mut EditSession) -> anyhow::Result<NodeId> {
    let config = session.document().config();
    let steps = session.add_child(config, NodeKind::InstallSteps)?;
    let step = session.add_child(steps, NodeKind::InstallStep)?;
    session.set_property(step, "name", "Textures")?;
    let groups = session.add_child(step, NodeKind::OptionalFileGroups)?;
    let group = session.add_child(groups, NodeKind::Group)?;
    session.set_property(group, "name", "Resolution")?;
    let plugins = session.add_child(group, NodeKind::Plugins)?;
    let plugin = session.add_child(plugins, NodeKind::Plugin)?;
    session.set_property(plugin, "name", "2K")?;
    Ok(plugin)
}

fn config_matches(session: &EditSession, snapshot: &Tree) -> bool {
    let config = session.document().config();
    session.tree().subtree_eq(config, snapshot, config)
}

#[test]
fn test_undo_all_then_redo_all_is_exact() -> anyhow::Result<()> {
    let mut session = EditSession::new(Settings::default());
    let mut snapshots = vec![session.tree().clone()];

    let plugin = add_plugin(&mut session)?;
    snapshots.push(session.tree().clone());

    let descriptor = session.add_child(plugin, NodeKind::TypeDescriptor)?;
    let plugin_type = session.add_child(descriptor, NodeKind::Type)?;
    snapshots.push(session.tree().clone());

    session.set_property(plugin_type, "name", "Recommended")?;
    let module_name = session.tree().children(session.document().config())[0];
    session.set_text(module_name, "Better Textures")?;
    snapshots.push(session.tree().clone());

    session.delete(descriptor)?;
    let last = session.tree().clone();

    while session.undo()? {}
    assert!(config_matches(&session, &snapshots[0]));
    assert!(!session.is_modified());

    while session.redo()? {}
    assert!(config_matches(&session, &last));

    // The same nodes come back, so references further up stay valid.
    session.undo()?;
    assert_eq!(session.tree().parent(descriptor), Some(plugin));
    assert!(config_matches(&session, &snapshots[3]));
    Ok(())
}

#[test]
fn test_either_group_refusal_leaves_history_untouched() -> anyhow::Result<()> {
    let mut session = EditSession::new(Settings::default());
    let plugin = add_plugin(&mut session)?;
    let descriptor = session.add_child(plugin, NodeKind::TypeDescriptor)?;
    session.add_child(descriptor, NodeKind::Type)?;

    let levels = session.undo_stack().undo_levels();
    let before = session.tree().clone();

    let refused = session.add_child(descriptor, NodeKind::DependencyType);
    assert!(matches!(
        refused,
        Err(EditorError::Tree(TreeError::StructuralViolation {
            violation: Violation::EitherGroupOccupied,
            ..
        }))
    ));
    assert_eq!(session.undo_stack().undo_levels(), levels);
    assert!(config_matches(&session, &before));

    // Removing the occupant frees the group.
    let plugin_type = session.tree().children(descriptor)[0];
    session.delete(plugin_type)?;
    session.add_child(descriptor, NodeKind::DependencyType)?;
    Ok(())
}

#[test]
fn test_roots_cannot_be_deleted() {
    let mut session = EditSession::new(Settings::default());
    let config = session.document().config();
    assert!(matches!(session.delete(config), Err(EditorError::CannotDeleteRoot)));
    assert!(!session.can_undo());
}

#[test]
fn test_copy_paste_is_independent_of_source() -> anyhow::Result<()> {
    let mut session = EditSession::new(Settings::default());
    let plugin = add_plugin(&mut session)?;
    let plugins = session.tree().parent(plugin).unwrap_or(plugin);

    assert!(matches!(session.paste(plugins), Err(EditorError::EmptyClipboard)));

    session.copy(plugin)?;
    session.set_property(plugin, "name", "4K")?;
    let pasted = session.paste(plugins)?;

    assert_eq!(session.tree().property(pasted, "name"), Some("2K"));
    assert_eq!(session.tree().children(plugins), &[plugin, pasted]);
    assert!(session.tree().sort_key(pasted) > session.tree().sort_key(plugin));

    session.undo()?;
    assert_eq!(session.tree().children(plugins), &[plugin]);
    Ok(())
}

#[test]
fn test_scratch_copy_replaces_subtree_in_one_step() -> anyhow::Result<()> {
    let mut session = EditSession::new(Settings::default());
    let plugin = add_plugin(&mut session)?;
    let plugins = session.tree().parent(plugin).unwrap_or(plugin);
    session.select(Some(plugin));

    let scratch = session.scratch_copy(plugin)?;
    session.modify_scratch(scratch, |tree, id| {
        tree.set_property(id, "name", "Edited");
    })?;
    assert!(matches!(
        session.modify_scratch(plugin, |_, _| {}),
        Err(EditorError::NotDetached(_))
    ));

    let levels = session.undo_stack().undo_levels();
    session.replace_subtree(plugin, scratch)?;
    assert_eq!(session.undo_stack().undo_levels(), levels + 1);
    assert_eq!(session.tree().children(plugins), &[scratch]);
    assert_eq!(session.selection(), Some(scratch));

    session.undo()?;
    assert_eq!(session.tree().children(plugins), &[plugin]);
    assert_eq!(session.tree().property(plugin, "name"), Some("2K"));
    Ok(())
}

#[test]
fn test_reorder_through_session() -> anyhow::Result<()> {
    let mut session = EditSession::new(Settings::default());
    let config = session.document().config();
    let module_name = session.tree().children(config)[0];
    let image = session.add_child(config, NodeKind::ModuleImage)?;
    let steps = session.add_child(config, NodeKind::InstallSteps)?;

    session.reorder(config, vec![steps, module_name, image])?;
    assert_eq!(session.tree().children(config), &[steps, module_name, image]);

    session.undo()?;
    assert_eq!(session.tree().children(config), &[module_name, image, steps]);
    Ok(())
}

#[test]
fn test_reorder_of_imported_zero_keys() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let fomod = dir.path().join("fomod");
    std::fs::create_dir_all(&fomod)?;
    std::fs::write(
        fomod.join("ModuleConfig.xml"),
        r#"<config>
            <moduleName>Mod</moduleName>
            <requiredInstallFiles>
                <file source="a.esp" destination="" user_sort_order="0"/>
                <file source="b.esp" destination="" user_sort_order="1"/>
                <file source="c.esp" destination="" user_sort_order="2"/>
            </requiredInstallFiles>
        </config>"#,
    )?;

    let mut settings = Settings::default();
    settings.load.validate_ignore = true;
    settings.load.warn_ignore = true;
    let mut session = EditSession::new(settings);
    session.open(dir.path())?;

    let config = session.document().config();
    let files = session.tree().children(config)[1];
    let [a, b, c] = <[NodeId; 3]>::try_from(session.tree().children(files).to_vec())
        .map_err(|_| anyhow::anyhow!("expected three files"))?;

    session.reorder(files, vec![c, a, b])?;
    assert_eq!(session.tree().children(files), &[c, a, b]);
    let keys: Vec<u32> = [c, a, b]
        .iter()
        .filter_map(|id| session.tree().sort_key(*id))
        .map(|key| key.value())
        .collect();
    assert_eq!(keys, vec![1, 2, 3]);

    session.undo()?;
    assert_eq!(session.tree().children(files), &[a, b, c]);
    Ok(())
}

#[test]
fn test_edits_refuse_nodes_outside_the_document() -> anyhow::Result<()> {
    let mut session = EditSession::new(Settings::default());
    let config = session.document().config();
    let module_name = session.tree().children(config)[0];
    let scratch = session.scratch_copy(module_name)?;

    assert!(matches!(session.set_text(scratch, "Other"), Err(EditorError::NotAttached(node)) if node == scratch));
    assert!(matches!(session.set_property(scratch, "name", "x"), Err(EditorError::NotAttached(_))));
    assert!(matches!(session.remove_property(scratch, "name"), Err(EditorError::NotAttached(_))));
    assert!(matches!(session.reorder(scratch, Vec::new()), Err(EditorError::NotAttached(_))));

    // Handles from another arena are refused rather than followed.
    let mut other = Tree::new();
    let mut foreign = other.create(NodeKind::ModuleName);
    for _ in 0..100 {
        foreign = other.create(NodeKind::ModuleName);
    }
    assert!(matches!(session.set_text(foreign, "Other"), Err(EditorError::NotAttached(_))));
    assert!(matches!(session.reorder(foreign, Vec::new()), Err(EditorError::NotAttached(_))));
    assert!(matches!(session.scratch_copy(foreign), Err(EditorError::NotAttached(_))));
    assert!(matches!(
        session.modify_scratch(foreign, |_, _| {}),
        Err(EditorError::Tree(TreeError::NodeNotFound(_)))
    ));

    assert!(!session.can_undo());
    assert_eq!(session.tree().text(module_name), "Mod");
    assert_eq!(session.tree().text(scratch), "Mod");
    Ok(())
}

struct SizeRecorder(Sender<(usize, bool)>);

impl PreviewRenderer for SizeRecorder {
    fn render(&mut self, snapshot: &PreviewSnapshot) {
        let focused = snapshot.focus.is_some();
        let _ = self.0.send((snapshot.tree.len(), focused));
    }
}

#[test]
fn test_unreferenced_nodes_are_released() -> anyhow::Result<()> {
    let (sender, receiver) = channel();
    let mut settings = Settings::default();
    settings.general.code_refresh = 1;
    let mut session = EditSession::new(settings);
    session.attach_preview(PreviewDispatcher::spawn(SizeRecorder(sender)));

    let plugin = add_plugin(&mut session)?;
    let attached = session.tree().len();

    // Only the latest clipboard copy outlives the loop.
    for _ in 0..50 {
        session.copy(plugin)?;
        let scratch = session.scratch_copy(plugin)?;
        session.discard_scratch(scratch);
    }
    assert_eq!(session.tree().len(), attached + 1);
    let scratch = session.scratch_copy(plugin)?;
    session.discard_scratch(scratch);
    assert!(matches!(
        session.modify_scratch(scratch, |_, _| {}),
        Err(EditorError::Tree(TreeError::NodeNotFound(_)))
    ));

    // Nodes dropped from the history go as well.
    let config = session.document().config();
    for _ in 0..40 {
        let image = session.add_child(config, NodeKind::ModuleImage)?;
        session.delete(image)?;
    }
    assert!(session.tree().len() <= attached + 1 + DEFAULT_UNDO_LEVELS);
    while session.undo()? {}

    // Previews carry the documents only, not the clipboard.
    session.select(Some(plugin));
    let documents = session.tree().descendants(session.document().info()).len()
        + session.tree().descendants(config).len();
    session.refresh();
    drop(session);

    assert_eq!(receiver.iter().last(), Some((documents, true)));
    Ok(())
}

#[test]
fn test_modified_tracks_history_position() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut session = EditSession::new(Settings::default());
    let module_name = session.tree().children(session.document().config())[0];

    assert!(!session.is_modified());
    session.set_text(module_name, "Mod")?;
    assert!(session.is_modified());

    session.save_as(dir.path())?;
    assert!(!session.is_modified());
    assert!(!session.document().is_dirty());

    session.undo()?;
    assert!(session.is_modified());
    session.redo()?;
    assert!(!session.is_modified());

    // Setting the same value again is not an edit.
    session.set_text(module_name, "Mod")?;
    assert!(!session.can_redo());
    assert!(!session.is_modified());
    Ok(())
}

#[test]
fn test_save_and_reopen() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut session = EditSession::new(Settings::default());
    let plugin = add_plugin(&mut session)?;
    let description = session.add_child(plugin, NodeKind::PluginDescription)?;
    session.set_text(description, "High resolution textures")?;

    // Incomplete plugins fail the save checks.
    let saved = session.save_as(dir.path());
    assert!(matches!(saved, Err(EditorError::SchemaValidation(_))));
    assert!(session.document().path().is_none());

    session.settings_mut().save.validate_ignore = true;
    session.save_as(dir.path())?;
    assert!(dir.path().join("fomod").join("ModuleConfig.xml").is_file());
    assert!(dir.path().join("fomod").join("Info.xml").is_file());
    assert_eq!(session.settings().recent_files[0], dir.path());

    let saved = session.tree().clone();
    let mut settings = session.settings().clone();
    settings.load.validate_ignore = true;
    let mut reopened = EditSession::new(settings);
    reopened.open(dir.path())?;
    assert!(config_matches(&reopened, &saved));
    assert!(!reopened.can_undo());
    Ok(())
}

#[test]
fn test_failed_open_keeps_current_document() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let fomod = dir.path().join("fomod");
    std::fs::create_dir_all(&fomod)?;
    std::fs::write(fomod.join("ModuleConfig.xml"), "<config><moduleName>")?;

    let mut session = EditSession::new(Settings::default());
    let module_name = session.tree().children(session.document().config())[0];
    session.set_text(module_name, "Keep me")?;

    assert!(matches!(session.open(dir.path()), Err(EditorError::Parse(_))));
    assert_eq!(session.tree().text(module_name), "Keep me");
    assert!(session.can_undo());
    assert!(session.settings().recent_files.is_empty());
    Ok(())
}

#[test]
fn test_open_directory_without_installer() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut session = EditSession::new(Settings::default());
    session.open(dir.path())?;

    assert_eq!(session.document().path(), Some(dir.path()));
    assert_eq!(session.tree().children(session.document().config()).len(), 1);
    Ok(())
}

#[test]
fn test_events_follow_edits_and_selection() -> anyhow::Result<()> {
    let mut session = EditSession::new(Settings::default());
    let events = session.subscribe();
    let config = session.document().config();

    let image = session.add_child(config, NodeKind::ModuleImage)?;
    assert_eq!(events.try_recv(), Ok(EditorEvent::DocumentChanged(Some(config))));

    session.select(Some(image));
    assert_eq!(events.try_recv(), Ok(EditorEvent::SelectionChanged(Some(image))));

    // Deleting the selection moves it to the parent.
    session.delete(image)?;
    assert_eq!(events.try_recv(), Ok(EditorEvent::DocumentChanged(Some(config))));
    assert_eq!(events.try_recv(), Ok(EditorEvent::SelectionChanged(Some(config))));

    session.undo()?;
    assert_eq!(events.try_recv(), Ok(EditorEvent::DocumentChanged(Some(config))));
    assert!(events.try_recv().is_err());
    Ok(())
}

struct RevisionRecorder(Sender<u64>);

impl PreviewRenderer for RevisionRecorder {
    fn render(&mut self, snapshot: &PreviewSnapshot) {
        let _ = self.0.send(snapshot.revision);
    }
}

/// Run `script` with the given refresh level and collect rendered revisions
fn previews(level: u8, script: impl FnOnce(&mut EditSession) -> anyhow::Result<()>) -> anyhow::Result<(Vec<u64>, u64)> {
    let (sender, receiver) = channel();
    let mut settings = Settings::default();
    settings.general.code_refresh = level;

    let mut session = EditSession::new(settings);
    session.attach_preview(PreviewDispatcher::spawn(RevisionRecorder(sender)));
    script(&mut session)?;
    let revision = session.revision();

    // Dropping the session joins the preview worker.
    drop(session);
    Ok((receiver.iter().collect(), revision))
}

#[test]
fn test_preview_refresh_levels() -> anyhow::Result<()> {
    let script = |session: &mut EditSession| -> anyhow::Result<()> {
        let config = session.document().config();
        let image = session.add_child(config, NodeKind::ModuleImage)?;
        session.select(Some(image));
        Ok(())
    };

    let (rendered, _) = previews(0, |session| {
        script(session)?;
        session.refresh();
        Ok(())
    })?;
    assert!(rendered.is_empty());

    let (rendered, revision) = previews(1, |session| {
        script(session)?;
        session.refresh();
        Ok(())
    })?;
    assert_eq!(rendered, vec![revision]);

    let (rendered, _) = previews(1, script)?;
    assert!(rendered.is_empty());

    let (rendered, revision) = previews(2, script)?;
    assert_eq!(rendered, vec![revision]);

    let (rendered, revision) = previews(3, script)?;
    assert_eq!(rendered.last(), Some(&revision));
    Ok(())
}

#[test]
fn test_code_preview_receives_selection() -> anyhow::Result<()> {
    let (sender, receiver) = channel();
    let mut settings = Settings::default();
    settings.general.code_refresh = 2;

    let mut session = EditSession::new(settings);
    session.attach_preview(PreviewDispatcher::spawn(fomod_editor::CodePreview::new(sender)));
    let module_name = session.tree().children(session.document().config())[0];
    session.set_text(module_name, "Shown")?;
    session.select(Some(module_name));

    let output = receiver.recv_timeout(Duration::from_secs(5))?;
    assert_eq!(output.revision, session.revision());
    assert!(output.code.contains(">Shown</moduleName>"));
    Ok(())
}
