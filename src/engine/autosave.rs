use std::time::{Duration, Instant};

use indexmap::IndexMap;

use crate::model::task::FieldValue;

use super::debounce::Debouncer;

/// A full-field-set save ready to dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct SavePayload {
    pub entity_id: String,
    pub fields: IndexMap<String, FieldValue>,
}

/// Debounced persistence for one open detail entity.
///
/// Field changes arm a single quiet-window timer; when it fires the full
/// editable field set is serialized and compared by value against the last
/// successfully saved serialization — identical payloads issue no call.
/// At most one scheduler exists per open entity.
#[derive(Debug)]
pub struct AutosaveScheduler {
    entity_id: String,
    timer: Debouncer,
    /// Canonical serialization of the last successful save
    last_saved: Option<String>,
}

impl AutosaveScheduler {
    /// Open the scheduler over an entity's current (persisted) field set,
    /// so an untouched form never triggers a write.
    pub fn open(
        entity_id: impl Into<String>,
        initial: &IndexMap<String, FieldValue>,
        window: Duration,
    ) -> Self {
        AutosaveScheduler {
            entity_id: entity_id.into(),
            timer: Debouncer::new(window),
            last_saved: Some(serialize(initial)),
        }
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn save_pending(&self) -> bool {
        self.timer.pending()
    }

    /// An observed field change: reset the quiet window
    pub fn note_change(&mut self, now: Instant) {
        self.timer.trigger(now);
    }

    /// Drive the timer. When the window elapses, build the payload and
    /// skip it if byte-identical to the last saved snapshot.
    pub fn poll(
        &mut self,
        now: Instant,
        draft: &IndexMap<String, FieldValue>,
    ) -> Option<SavePayload> {
        if !self.timer.fire(now) {
            return None;
        }
        self.build_if_changed(draft)
    }

    /// Immediate save path (title blur): same build/skip pipeline, no
    /// timer involved.
    pub fn immediate(&mut self, draft: &IndexMap<String, FieldValue>) -> Option<SavePayload> {
        self.build_if_changed(draft)
    }

    /// The editor is closing. Cancel any pending timer and execute the
    /// save it was holding — a close never drops an edit.
    pub fn flush(&mut self, draft: &IndexMap<String, FieldValue>) -> Option<SavePayload> {
        self.timer.cancel();
        self.build_if_changed(draft)
    }

    /// The dispatched save landed; remember its serialization
    pub fn save_succeeded(&mut self, fields: &IndexMap<String, FieldValue>) {
        self.last_saved = Some(serialize(fields));
    }

    /// Absorb an out-of-band write (the status narrow save) so the next
    /// cycle does not re-send an unchanged payload.
    pub fn sync_snapshot(&mut self, draft: &IndexMap<String, FieldValue>) {
        self.last_saved = Some(serialize(draft));
    }

    fn build_if_changed(&mut self, draft: &IndexMap<String, FieldValue>) -> Option<SavePayload> {
        let serialized = serialize(draft);
        if self.last_saved.as_deref() == Some(serialized.as_str()) {
            return None;
        }
        Some(SavePayload {
            entity_id: self.entity_id.clone(),
            fields: draft.clone(),
        })
    }
}

/// Canonical form for value comparison. IndexMap keeps schema order, so
/// equal drafts serialize identically.
fn serialize(fields: &IndexMap<String, FieldValue>) -> String {
    serde_json::to_string(fields).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const WINDOW: Duration = Duration::from_millis(800);

    fn draft(pairs: &[(&str, &str)]) -> IndexMap<String, FieldValue> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), FieldValue::Text(v.to_string())))
            .collect()
    }

    #[test]
    fn burst_of_changes_coalesces_into_one_save() {
        let t0 = Instant::now();
        let initial = draft(&[("title", "a"), ("notes", "")]);
        let mut sched = AutosaveScheduler::open("T-1", &initial, WINDOW);

        let mut current = initial.clone();
        current.insert("title".into(), FieldValue::Text("ab".into()));
        sched.note_change(t0);
        current.insert("notes".into(), FieldValue::Text("n".into()));
        sched.note_change(t0 + Duration::from_millis(500));

        // First deadline (t0+800) was pushed out by the second change
        assert!(sched.poll(t0 + Duration::from_millis(900), &current).is_none());
        let payload = sched
            .poll(t0 + Duration::from_millis(1300), &current)
            .unwrap();
        assert_eq!(payload.entity_id, "T-1");
        assert_eq!(payload.fields, current);
        // Timer consumed: no second fire
        assert!(sched.poll(t0 + Duration::from_millis(2000), &current).is_none());
    }

    #[test]
    fn unchanged_payload_is_skipped() {
        let t0 = Instant::now();
        let initial = draft(&[("title", "a")]);
        let mut sched = AutosaveScheduler::open("T-1", &initial, WINDOW);

        // A change that ends up back at the saved value
        sched.note_change(t0);
        assert!(sched.poll(t0 + WINDOW, &initial).is_none());
    }

    #[test]
    fn second_cycle_with_identical_form_issues_nothing() {
        let t0 = Instant::now();
        let initial = draft(&[("title", "a")]);
        let mut sched = AutosaveScheduler::open("T-1", &initial, WINDOW);

        let changed = draft(&[("title", "b")]);
        sched.note_change(t0);
        let payload = sched.poll(t0 + WINDOW, &changed).unwrap();
        sched.save_succeeded(&payload.fields);

        // Unrelated re-render triggers another cycle over the same values
        sched.note_change(t0 + Duration::from_millis(1000));
        assert!(sched.poll(t0 + Duration::from_millis(1800), &changed).is_none());
    }

    #[test]
    fn flush_on_close_cancels_timer_and_saves_immediately() {
        let t0 = Instant::now();
        let initial = draft(&[("title", "a")]);
        let mut sched = AutosaveScheduler::open("T-1", &initial, WINDOW);

        let changed = draft(&[("title", "edited")]);
        sched.note_change(t0 + Duration::from_millis(200));
        // Close at t=300, well before the 800ms deadline
        let payload = sched.flush(&changed).unwrap();
        assert_eq!(payload.fields, changed);
        assert!(!sched.save_pending());
        // The cancelled timer never fires afterwards
        assert!(sched.poll(t0 + Duration::from_secs(5), &changed).is_none());
    }

    #[test]
    fn flush_with_clean_form_saves_nothing() {
        let initial = draft(&[("title", "a")]);
        let mut sched = AutosaveScheduler::open("T-1", &initial, WINDOW);
        assert!(sched.flush(&initial).is_none());
    }

    #[test]
    fn immediate_title_path_skips_if_unchanged() {
        let initial = draft(&[("title", "a")]);
        let mut sched = AutosaveScheduler::open("T-1", &initial, WINDOW);
        assert!(sched.immediate(&initial).is_none());

        let changed = draft(&[("title", "b")]);
        let payload = sched.immediate(&changed).unwrap();
        assert_eq!(payload.fields, changed);
    }

    #[test]
    fn sync_snapshot_absorbs_narrow_status_write() {
        let t0 = Instant::now();
        let initial = draft(&[("title", "a"), ("status", "open")]);
        let mut sched = AutosaveScheduler::open("T-1", &initial, WINDOW);

        // Status changed via its own immediate single-field update
        let after_status = draft(&[("title", "a"), ("status", "done")]);
        sched.sync_snapshot(&after_status);

        sched.note_change(t0);
        assert!(sched.poll(t0 + WINDOW, &after_status).is_none());
    }
}
