use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use runvisor::{
    ActivationGate, DataEvent, Descriptor, Document, DocumentListener, DocumentRouter, ExitStatus,
    GatedHandler, HandlerError, RunStart, RunStop,
};

struct Writer {
    name: &'static str,
    seen: Mutex<Vec<String>>,
}

impl Writer {
    fn named(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            seen: Mutex::new(Vec::new()),
        })
    }

    fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    fn push(&self, entry: String) {
        self.seen.lock().unwrap().push(entry);
    }
}

impl GatedHandler for Writer {
    fn name(&self) -> &str {
        self.name
    }
    fn start(&self, doc: &RunStart) -> Result<(), HandlerError> {
        self.push(format!("start:{}", doc.run_uid));
        Ok(())
    }
    fn descriptor(&self, doc: &Descriptor) -> Result<(), HandlerError> {
        self.push(format!("descriptor:{}", doc.descriptor_uid));
        Ok(())
    }
    fn event(&self, doc: &DataEvent) -> Result<(), HandlerError> {
        self.push(format!("event:{}", doc.descriptor_uid));
        Ok(())
    }
    fn stop(&self, doc: &RunStop) -> Result<(), HandlerError> {
        self.push(format!("stop:{}", doc.run_start));
        Ok(())
    }
}

fn descriptor(uid: &str, run: &str) -> Document {
    Document::Descriptor(Descriptor {
        descriptor_uid: uid.into(),
        run_uid: run.into(),
        name: "primary".into(),
    })
}

fn event(descriptor_uid: &str) -> Document {
    Document::DataEvent(DataEvent {
        descriptor_uid: descriptor_uid.into(),
        data: BTreeMap::new(),
    })
}

fn stop(run: &str) -> Document {
    Document::RunStop(RunStop {
        run_start: run.into(),
        exit_status: ExitStatus::Success,
        reason: None,
    })
}

#[test]
fn listed_handler_sees_exactly_its_bracketed_run() {
    let writer = Writer::named("nexus");
    let bystander = Writer::named("zocalo");
    let router = DocumentRouter::new();
    router.subscribe(ActivationGate::arc(writer.clone()));
    router.subscribe(ActivationGate::arc(bystander.clone()));

    let docs: Vec<Document> = vec![
        // Not listed: neither handler may act on this run.
        RunStart::new("r0").with_activate_callbacks(["ispyb"]).into(),
        descriptor("d0", "r0"),
        event("d0"),
        stop("r0"),
        RunStart::new("r1").with_activate_callbacks(["nexus"]).into(),
        descriptor("d1", "r1"),
        event("d1"),
        event("d1"),
        stop("r1"),
        event("d1"),
    ];
    for doc in &docs {
        router.dispatch(doc).unwrap();
    }

    assert_eq!(
        writer.seen(),
        ["start:r1", "descriptor:d1", "event:d1", "event:d1", "stop:r1"]
    );
    assert!(bystander.seen().is_empty());
}

#[test]
fn first_run_is_adopted_and_nested_runs_do_not_retrigger() {
    let writer = Writer::named("recorder");
    let gate = ActivationGate::arc(writer.clone());
    let router = DocumentRouter::with_listeners(vec![gate.clone() as Arc<dyn DocumentListener>]);

    let docs: Vec<Document> = vec![
        RunStart::new("outer").into(),
        RunStart::new("inner").into(),
        stop("inner"),
        RunStart::new("inner-2").into(),
        stop("inner-2"),
        stop("outer"),
        // Gate is inactive again: the next unlisted run is adopted.
        RunStart::new("next").into(),
    ];
    for doc in &docs {
        router.dispatch(doc).unwrap();
    }

    assert_eq!(
        writer.seen(),
        [
            "start:outer",
            "start:inner",
            "stop:inner",
            "start:inner-2",
            "stop:inner-2",
            "stop:outer",
            "start:next",
        ]
    );
    assert_eq!(gate.activation_run_uid().as_deref(), Some("next"));
}

#[test]
fn run_key_restricts_adoption_to_named_runs() {
    let writer = Writer::named("recorder");
    let gate = ActivationGate::new(writer.clone()).with_run_key("data_collection");
    let router = DocumentRouter::with_listeners(vec![Arc::new(gate) as Arc<dyn DocumentListener>]);

    router
        .dispatch(&RunStart::new("r1").with_run_name("robot_load").into())
        .unwrap();
    router.dispatch(&stop("r1")).unwrap();
    router
        .dispatch(&RunStart::new("r2").with_run_name("data_collection").into())
        .unwrap();

    assert_eq!(writer.seen(), ["start:r2"]);
}

#[test]
fn unsubscribed_listener_receives_nothing_further() {
    let writer = Writer::named("recorder");
    let router = DocumentRouter::new();
    let id = router.subscribe(ActivationGate::arc(writer.clone()));

    router.dispatch(&RunStart::new("r1").into()).unwrap();
    assert!(router.unsubscribe(id));
    router.dispatch(&stop("r1")).unwrap();

    assert_eq!(writer.seen(), ["start:r1"]);
    assert!(router.is_empty());
}
