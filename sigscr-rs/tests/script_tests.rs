use sigscr::diag::DiagnosticKind;
use sigscr::loader::ScriptRegistry;
use sigscr::script::catalog::{aspect, block, sigfn};
use sigscr::script::{dump_script, ControlFlow};
use sigscr::signal::{update_signal, FixedSignal, SignalTypeCatalog, Update};

const ROUTE_SCRIPTS: &str = r#"
/* Signal scripts for a small route.
   Home signals protect junctions, distants repeat the home ahead. */

SCRIPT UKHome
    extern float state;
    extern float draw_state;
    extern float block_state;
    float next_state;

    if (block_state ==# BLOCK_JN_OBSTRUCTED) {
        state = SIGASP_STOP;
    } else if (block_state ==# BLOCK_OCCUPIED) {
        state = SIGASP_STOP;
    } else {
        next_state = next_sig_lr(SIGFN_NORMAL);
        if (next_state == SIGASP_STOP) {
            state = SIGASP_APPROACH_1;
        } else {
            state = SIGASP_CLEAR_2;
        }
    }
    draw_state = def_draw_state(state);

SCRIPT UKDist
    extern float state;
    float home;

    home = next_sig_mr(SIGFN_NORMAL);
    if (home <= SIGASP_STOP_AND_PROCEED) state = SIGASP_APPROACH_1;
    else state = SIGASP_CLEAR_2;
    draw_state = def_draw_state(state);

REM SCRIPT Retired
    state = SIGASP_CLEAR_2;

SCRIPT Shunt
    // Ground signal: off only when the route is set and the dispatcher allows it
    if (!enabled || !route_set()) {
        state = SIGASP_STOP;
        draw_state = 0;
        return;
    }
    state = SIGASP_RESTRICTING;
    draw_state = 1;

SCRIPT Semaphore
    state = SIGASP_CLEAR_2;

SCRIPT ukhome
    state = SIGASP_STOP;

SCRIPT Broken
    state = SIGASP_STOP
    draw_state = bogus_state;
"#;

fn catalog() -> SignalTypeCatalog {
    ["UKHome", "UKDist", "Shunt", "Broken", "Permissive"].into_iter().collect()
}

fn load() -> (ScriptRegistry, Vec<sigscr::diag::Diagnostic>) {
    let mut reg = ScriptRegistry::new();
    let diags = reg.load_source("route.dat", ROUTE_SCRIPTS.as_bytes(), &catalog()).unwrap();
    (reg, diags)
}

fn home_signal() -> FixedSignal {
    let mut sig = FixedSignal::default();
    sig.draw_states.extend([(aspect::STOP, 0), (aspect::APPROACH_1, 1), (aspect::CLEAR_2, 2)]);
    sig
}

#[test]
fn registers_known_scripts_only() {
    let (reg, diags) = load();
    let mut names: Vec<&str> = reg.names().collect();
    names.sort();
    assert_eq!(names, vec!["BROKEN", "SHUNT", "UKDIST", "UKHOME"]);

    let registration: Vec<_> = diags.iter().filter(|d| d.kind == DiagnosticKind::Registration).collect();
    assert_eq!(registration.len(), 2, "{registration:?}");
    assert!(registration.iter().any(|d| d.message.contains("unknown signal type 'SEMAPHORE'")));
    assert!(registration.iter().any(|d| d.message.contains("duplicate")));
}

#[test]
fn rem_script_is_not_compiled() {
    let (reg, diags) = load();
    assert!(!reg.contains("retired"));
    assert!(diags.iter().all(|d| d.script != "RETIRED"));
}

#[test]
fn broken_script_reports_and_still_registers() {
    let (reg, diags) = load();
    assert!(reg.contains("Broken"));
    let broken: Vec<_> = diags.iter().filter(|d| d.script == "BROKEN").collect();
    assert!(!broken.is_empty());
    assert!(broken.iter().all(|d| d.file == "route.dat"));
    assert!(broken.iter().any(|d| d.kind == DiagnosticKind::Structure));
}

#[test]
fn home_signal_follows_block_and_next_signal() {
    let (reg, _) = load();

    let mut sig = home_signal();
    sig.block_state = block::OCCUPIED;
    assert_eq!(update_signal(&reg, "UKHome", &mut sig), Update::Script(ControlFlow::Continue));
    assert_eq!(sig.state, aspect::STOP);
    assert_eq!(sig.draw_state, 0);

    let mut sig = home_signal();
    sig.next_sig[sigfn::NORMAL as usize] = aspect::STOP;
    update_signal(&reg, "ukhome", &mut sig);
    assert_eq!(sig.state, aspect::APPROACH_1);
    assert_eq!(sig.draw_state, 1);

    let mut sig = home_signal();
    sig.next_sig[sigfn::NORMAL as usize] = aspect::CLEAR_2;
    update_signal(&reg, "UKHOME", &mut sig);
    assert_eq!(sig.state, aspect::CLEAR_2);
    assert_eq!(sig.draw_state, 2);
}

#[test]
fn distant_repeats_home() {
    let (reg, _) = load();
    for (home, want) in [
        (aspect::STOP, aspect::APPROACH_1),
        (aspect::STOP_AND_PROCEED, aspect::APPROACH_1),
        (aspect::CLEAR_2, aspect::CLEAR_2),
    ] {
        let mut sig = home_signal();
        sig.next_sig[sigfn::NORMAL as usize] = home;
        update_signal(&reg, "UKDist", &mut sig);
        assert_eq!(sig.state, want, "home aspect {home}");
    }
}

#[test]
fn shunt_returns_early_when_not_cleared() {
    let (reg, _) = load();

    let mut sig = FixedSignal { enabled: true, ..FixedSignal::default() };
    assert_eq!(update_signal(&reg, "Shunt", &mut sig), Update::Script(ControlFlow::Return));
    assert_eq!(sig.state, aspect::STOP);
    assert_eq!(sig.draw_state, 0);

    let mut sig = FixedSignal { enabled: true, route_set: true, ..FixedSignal::default() };
    assert_eq!(update_signal(&reg, "Shunt", &mut sig), Update::Script(ControlFlow::Continue));
    assert_eq!(sig.state, aspect::RESTRICTING);
    assert_eq!(sig.draw_state, 1);
}

#[test]
fn types_without_script_use_fallback() {
    let (reg, _) = load();

    let mut sig = FixedSignal { state: aspect::APPROACH_1, ..FixedSignal::default() };
    assert_eq!(update_signal(&reg, "Permissive", &mut sig), Update::Fallback);
    assert_eq!(sig.state, aspect::CLEAR_2);

    let mut sig = FixedSignal { block_state: block::JN_OBSTRUCTED, ..FixedSignal::default() };
    assert_eq!(update_signal(&reg, "Permissive", &mut sig), Update::Fallback);
    assert_eq!(sig.state, aspect::STOP);
}

#[test]
fn dump_lists_locals_and_branches() {
    let (reg, _) = load();
    let text = dump_script(reg.get("UKHome").unwrap());
    assert!(text.starts_with("SCRIPT UKHOME\n"), "{text}");
    assert!(text.contains("FLOAT NEXT_STATE  ; slot 0"), "{text}");
    assert!(text.contains("ELSEIF"), "{text}");
    assert!(text.contains("ENDIF"), "{text}");
}

#[test]
fn latin1_comment_between_scripts() {
    let mut reg = ScriptRegistry::new();
    let src: &[u8] = b"SCRIPT UKHome\nstate = SIGASP_CLEAR_2;\n// caf\xe9 \xa9 route\nSCRIPT Shunt\nstate = SIGASP_RESTRICTING;\n";
    let diags = reg.load_source("latin1.dat", src, &catalog()).unwrap();
    assert!(diags.is_empty(), "{diags:?}");

    let mut sig = FixedSignal::default();
    update_signal(&reg, "Shunt", &mut sig);
    assert_eq!(sig.state, aspect::RESTRICTING);
}

#[test]
fn utf16_route_file() {
    let text = "SCRIPT UKHome\r\n  state = SIGASP_APPROACH_1;\r\n";
    let mut src = vec![0xFF, 0xFE];
    src.extend(text.encode_utf16().flat_map(u16::to_le_bytes));

    let mut reg = ScriptRegistry::new();
    let diags = reg.load_source("utf16.dat", src.as_slice(), &catalog()).unwrap();
    assert!(diags.is_empty(), "{diags:?}");

    let mut sig = FixedSignal::default();
    assert_eq!(update_signal(&reg, "UKHome", &mut sig), Update::Script(ControlFlow::Continue));
    assert_eq!(sig.state, aspect::APPROACH_1);
}

#[test]
fn malformed_guard_does_not_clear_signal() {
    let src = "SCRIPT UKHome\nstate = SIGASP_STOP;\nif block_state == BLOCK_CLEAR {\n state = SIGASP_CLEAR_2;\n}\n";
    let mut reg = ScriptRegistry::new();
    let diags = reg.load_source("guard.dat", src.as_bytes(), &catalog()).unwrap();
    assert!(diags.iter().any(|d| d.kind == DiagnosticKind::Structure), "{diags:?}");

    let mut sig = FixedSignal { block_state: block::CLEAR, ..FixedSignal::default() };
    update_signal(&reg, "UKHome", &mut sig);
    assert_eq!(sig.state, aspect::STOP);
}

#[test]
fn negated_side_of_comparison_is_compared_as_written() {
    let src = "SCRIPT UKHome\nfloat a;\nfloat b;\na = 1;\nb = 1;\nif (a == !b) draw_state = 1;\nelse draw_state = 2;\n";
    let mut reg = ScriptRegistry::new();
    reg.load_source("neg.dat", src.as_bytes(), &catalog()).unwrap();

    let mut sig = FixedSignal::default();
    update_signal(&reg, "UKHome", &mut sig);
    assert_eq!(sig.draw_state, 1);
}
