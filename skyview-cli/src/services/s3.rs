//! S3 buckets and a prefix-aware object browser.

use std::path::{Path, PathBuf};
use std::time::Instant;

use ratatui::Frame;
use ratatui::layout::Rect;
use tracing::{info, warn};

use skyview_core::drill::{DrillKey, PageKind, PaneKind, Selection};
use skyview_core::format::format_bytes;
use skyview_core::keymap::{Action, KeyBinding};
use skyview_core::resource::{Bucket, ObjectSummary};

use crate::loader::{LoadOutcome, UiDataLoader};
use crate::services::{ListWithDetails, nothing, outcome, paged_source};
use crate::ui::component::{EventCx, KeyOutcome};
use crate::ui::page::PageBody;
use crate::ui::paged::PagedTable;
use crate::ui::table::TableEvent;

pub fn pages(cx: &EventCx) -> Vec<Box<dyn PageBody>> {
    vec![Box::new(BucketsPage::new(cx)), Box::new(ObjectsPage::new(cx))]
}

struct BucketsPage {
    buckets: PagedTable<(), Bucket>,
}

impl BucketsPage {
    fn new(cx: &EventCx) -> Self {
        let source = paged_source(cx, "buckets", (), |bundle, (), limit, cursor| async move {
            bundle.buckets.list_buckets(limit, cursor).await
        });
        Self {
            buckets: PagedTable::new("Buckets", source, cx),
        }
    }
}

impl PageBody for BucketsPage {
    fn kind(&self) -> PageKind {
        PageKind::Buckets
    }

    fn panes(&self) -> Vec<PaneKind> {
        vec![PaneKind::Buckets]
    }

    fn handle_key(&mut self, pane: PaneKind, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        if pane != PaneKind::Buckets {
            return KeyOutcome::Ignored;
        }
        let event = self.buckets.handle_key(key, cx);
        if let (TableEvent::Selected(_), Some(bucket)) = (event, self.buckets.selected()) {
            cx.drill(Selection::Bucket(bucket.clone()));
        }
        outcome(event)
    }

    fn tick(&mut self, cx: &mut EventCx, now: Instant) {
        self.buckets.tick(cx, now);
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, focus: PaneKind, _: u16) {
        self.buckets.render(frame, area, focus == PaneKind::Buckets);
    }

    fn configure(&mut self, _: PaneKind, _: &DrillKey, _: &EventCx) -> bool {
        false
    }

    fn refresh(&mut self, _: PaneKind, reset: bool, cx: &EventCx) {
        self.buckets.refresh(reset, cx);
    }

    fn activate(&mut self, cx: &EventCx) {
        self.buckets.refresh(true, cx);
    }

    fn status(&self, _: PaneKind) -> String {
        self.buckets.status()
    }

    fn is_capturing(&self) -> bool {
        self.buckets.is_filtering()
    }
}

/// `a/b/c/` → `a/b/`, `a/` → ``.
fn parent_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(i) => trimmed[..=i].to_string(),
        None => String::new(),
    }
}

/// Last path segment of `key`, if it names a file.
fn file_name(key: &str) -> Option<&str> {
    match key.rsplit('/').next() {
        None | Some("" | "." | "..") => None,
        Some(name) => Some(name),
    }
}

type Download = Result<(PathBuf, usize), String>;

struct ObjectsPage {
    view: ListWithDetails<(String, String), ObjectSummary>,
    download: UiDataLoader<Download>,
    target_dir: PathBuf,
}

impl ObjectsPage {
    fn new(cx: &EventCx) -> Self {
        let source = paged_source(
            cx,
            "objects",
            (String::new(), String::new()),
            |bundle, (bucket, prefix): (String, String), limit, cursor| async move {
                if bucket.is_empty() {
                    return nothing();
                }
                bundle
                    .buckets
                    .list_objects(&bucket, &prefix, limit, cursor)
                    .await
            },
        );
        Self {
            view: ListWithDetails::new(
                PagedTable::new("Objects", source, cx),
                PaneKind::Objects,
                PaneKind::ObjectDetails,
            )
            .drill_with(|o| Selection::Object(o.clone())),
            download: UiDataLoader::new("download", &cx.ctx.config.loader),
            target_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    fn browse(&mut self, bucket: &str, prefix: &str) {
        self.view
            .list
            .set_title(&format!("Objects: s3://{bucket}/{prefix}"));
        self.view.list.set_key((bucket.to_string(), prefix.to_string()));
    }

    fn go_up(&mut self, cx: &EventCx) {
        let (bucket, prefix) = self.view.list.params();
        if bucket.is_empty() || prefix.is_empty() {
            return;
        }
        self.browse(&bucket, &parent_prefix(&prefix));
        self.view.list.refresh(true, cx);
    }

    fn start_download(&mut self, cx: &mut EventCx) {
        let Some(object) = self.view.list.selected().cloned() else {
            return;
        };
        if object.is_prefix {
            cx.info(format!("{} is a prefix", object.key));
            return;
        }
        if self.download.is_loading() {
            return;
        }
        let Some(name) = file_name(&object.key) else {
            cx.error(format!("Cannot download {}: key does not end in a file name", object.key));
            return;
        };
        let gateway = cx.ctx.bundle().buckets.clone();
        let path = self.target_dir.join(name);
        info!(bucket = %object.bucket, key = %object.key, path = %path.display(), "downloading object");
        self.download.load_async(
            async move {
                let bytes = gateway
                    .download_object(&object.bucket, &object.key)
                    .await
                    .map_err(|e| e.to_string())?;
                write_file(&path, &bytes).await?;
                Ok::<_, String>((path, bytes.len()))
            },
            cx.ctx.cancellation(),
            cx.ctx.redraw.clone(),
        );
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<(), String> {
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| format!("Failed to write {}: {e}", path.display()))
}

impl PageBody for ObjectsPage {
    fn kind(&self) -> PageKind {
        PageKind::Objects
    }

    fn panes(&self) -> Vec<PaneKind> {
        self.view.panes()
    }

    fn handle_key(&mut self, pane: PaneKind, key: &KeyBinding, cx: &mut EventCx) -> KeyOutcome {
        if pane == PaneKind::Objects && !self.view.list.is_filtering() {
            if cx.is(Action::ParentPrefix, key) {
                self.go_up(cx);
                return KeyOutcome::Consumed;
            }
            if cx.is(Action::Download, key) {
                self.start_download(cx);
                return KeyOutcome::Consumed;
            }
        }
        self.view.handle_key(pane, key, cx)
    }

    fn tick(&mut self, cx: &mut EventCx, now: Instant) {
        self.view.tick(cx, now);
        if self.download.spin(now) {
            cx.mark_dirty();
        }
        match self.download.poll() {
            Some(LoadOutcome::Done(Ok((path, size)))) => {
                cx.info(format!(
                    "Downloaded {} ({})",
                    path.display(),
                    format_bytes(size as u64)
                ));
            }
            Some(LoadOutcome::Done(Err(reason)) | LoadOutcome::Failed(reason)) => {
                warn!(error = %reason, "download failed");
                cx.error(reason);
            }
            Some(LoadOutcome::TimedOut | LoadOutcome::Cancelled) | None => return,
        }
        cx.mark_dirty();
    }

    fn render(&mut self, frame: &mut Frame, area: Rect, focus: PaneKind, split: u16) {
        self.view.render(frame, area, focus, split);
        self.download.render_throbber(frame, area);
    }

    fn configure(&mut self, pane: PaneKind, key: &DrillKey, _: &EventCx) -> bool {
        match (pane, key) {
            (PaneKind::Objects, DrillKey::Bucket { bucket, prefix }) => {
                self.browse(bucket, prefix);
                true
            }
            _ => false,
        }
    }

    fn refresh(&mut self, pane: PaneKind, reset: bool, cx: &EventCx) {
        if pane == PaneKind::Objects {
            self.view.list.refresh(reset, cx);
        }
    }

    fn status(&self, _: PaneKind) -> String {
        let (bucket, prefix) = self.view.list.params();
        if bucket.is_empty() {
            return "no bucket selected".to_string();
        }
        format!("s3://{bucket}/{prefix} · {}", self.view.status())
    }

    fn is_capturing(&self) -> bool {
        self.view.list.is_filtering()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{cx, settle};
    use crate::ui::component::{Effect, MessageKind};
    use skyview_core::drill::DrillController;
    use skyview_core::keymap::KeyName;

    #[test]
    fn test_parent_prefix() {
        assert_eq!(parent_prefix("images/icons/"), "images/");
        assert_eq!(parent_prefix("images/"), "");
        assert_eq!(parent_prefix(""), "");
    }

    #[test]
    fn test_file_name_rejects_directories() {
        assert_eq!(file_name("images/icons/close.svg"), Some("close.svg"));
        assert_eq!(file_name("readme"), Some("readme"));
        assert_eq!(file_name("images/"), None);
        assert_eq!(file_name(""), None);
        assert_eq!(file_name(".."), None);
        assert_eq!(file_name("a/."), None);
    }

    async fn open_bucket(page: &mut ObjectsPage, cx: &mut EventCx) -> String {
        let buckets = cx.ctx.bundle().buckets.list_buckets(1, None).await.unwrap();
        let bucket = buckets.items[0].name.clone();
        let key = DrillKey::Bucket {
            bucket: bucket.clone(),
            prefix: String::new(),
        };
        assert!(page.configure(PaneKind::Objects, &key, cx));
        page.refresh(PaneKind::Objects, true, cx);
        settle(page, cx, |p| !p.view.list.table().model().is_empty()).await;
        bucket
    }

    #[tokio::test]
    async fn test_prefix_navigation() {
        let mut cx = cx();
        let mut page = ObjectsPage::new(&cx);
        let bucket = open_bucket(&mut page, &mut cx).await;

        // Prefixes are listed before objects.
        let first = page.view.list.selected().cloned().unwrap();
        assert!(first.is_prefix);
        page.handle_key(PaneKind::Objects, &KeyBinding::plain(KeyName::Enter), &mut cx);
        let Some(Effect::Drill(selection)) = cx.take_effects().pop() else {
            panic!("expected a drill");
        };
        for step in DrillController::plan(&selection).unwrap() {
            if let skyview_core::drill::DrillStep::Configure { target, key } = step {
                page.configure(target.pane, &key, &cx);
            }
        }
        page.refresh(PaneKind::Objects, true, &cx);
        settle(&mut page, &mut cx, |p| !p.view.list.table().model().is_empty()).await;
        assert_eq!(page.view.list.params(), (bucket.clone(), first.key.clone()));

        page.handle_key(PaneKind::Objects, &KeyBinding::plain(KeyName::Backspace), &mut cx);
        assert_eq!(page.view.list.params(), (bucket, String::new()));
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut cx = cx();
        let mut page = ObjectsPage::new(&cx);
        page.target_dir = dir.path().to_path_buf();
        open_bucket(&mut page, &mut cx).await;

        page.handle_key(PaneKind::Objects, &KeyBinding::ch('d'), &mut cx);
        assert_eq!(cx.take_messages()[0].0, MessageKind::Info);
        assert!(!page.download.is_loading());

        page.handle_key(PaneKind::Objects, &KeyBinding::ch('G'), &mut cx);
        let object = page.view.list.selected().cloned().unwrap();
        assert!(!object.is_prefix);
        page.handle_key(PaneKind::Objects, &KeyBinding::ch('d'), &mut cx);
        settle(&mut page, &mut cx, |p| !p.download.is_loading()).await;

        let messages = cx.take_messages();
        assert!(messages[0].1.starts_with("Downloaded "));
        let written = std::fs::read(dir.path().join(file_name(&object.key).unwrap())).unwrap();
        let line = format!("demo object s3://{}/{}\n", object.bucket, object.key);
        assert_eq!(written.len(), (object.size as usize).max(line.len()));
        assert!(written.starts_with(line.as_bytes()));
    }
}
