//! End-to-end sessions against an in-process helper: the request loop runs on
//! a thread with a real `archcall::Engine` behind it, reached over a real
//! channel.

use std::collections::HashMap;
use std::ffi::c_char;
use std::ffi::c_void;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use archbridge::BridgeConfig;
use archbridge::Channel;
use archbridge::ChannelOptions;
use archbridge::ChannelToken;
use archbridge::Error;
use archbridge::HelperProcess;
use archbridge::LibraryInterface;
use archbridge::ProcedureSpec;
use archbridge::RequestLoop;
use archbridge::Session;
use archbridge::Supervisor;
use archcall::Engine;
use archcall::LibraryResolver;
use archcall::NativeLibrary;
use archwire::CallDescriptor;
use archwire::ErrorKind;
use archwire::Kind;
use archwire::TextEncoding;
use archwire::TypeDesc;
use archwire::Value;

// ============================================================================
//  IN-PROCESS HELPER
// ============================================================================

extern "C" fn increment(x: *mut i32) {
    unsafe { *x += 1 }
}

extern "C" fn increment_pair(a: *mut i32, b: *mut i32) {
    unsafe {
        *a += 1;
        *b += 1;
    }
}

extern "C" fn echo(s: *const c_char) -> *const c_char {
    s
}

extern "C" fn echo_wide(s: *const libc::wchar_t) -> *const libc::wchar_t {
    s
}

struct TestLibrary(HashMap<&'static str, usize>);

impl NativeLibrary for TestLibrary {
    fn symbol(&self, name: &str) -> Option<*const c_void> {
        self.0.get(name).map(|addr| *addr as *const c_void)
    }
}

struct TestResolver;

impl LibraryResolver for TestResolver {
    fn resolve(&self, identifier: &str) -> Result<Box<dyn NativeLibrary>, String> {
        if identifier != "TestDll" {
            return Err(format!("{} not found", identifier));
        }
        let symbols = [
            ("Increment", increment as usize),
            ("IncrementPair", increment_pair as usize),
            ("Echo", echo as usize),
            ("EchoWide", echo_wide as usize),
        ];
        Ok(Box::new(TestLibrary(symbols.into_iter().collect())))
    }
}

/// Runs the helper side on a thread instead of in a child process.
struct ThreadSupervisor {
    options: ChannelOptions,
}

struct ThreadHelper {
    handle: Option<JoinHandle<()>>,
}

impl Supervisor for ThreadSupervisor {
    fn start(&mut self, token: &ChannelToken) -> archbridge::Result<Box<dyn HelperProcess>> {
        let token = token.clone();
        let options = self.options.clone();
        let handle = thread::spawn(move || {
            let Ok(mut channel) = Channel::listen(&token, &options) else {
                return;
            };
            let mut engine = Engine::new(TestResolver);
            let _ = RequestLoop::new(|call: &CallDescriptor| engine.invoke(call)).run(&mut channel);
        });
        Ok(Box::new(ThreadHelper { handle: Some(handle) }))
    }
}

impl HelperProcess for ThreadHelper {
    fn exit_status(&mut self) -> Option<String> {
        match &self.handle {
            Some(handle) if !handle.is_finished() => None,
            _ => Some("finished".into()),
        }
    }

    fn stop(&mut self) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while self.exit_status().is_none() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        if let Some(handle) = self.handle.take().filter(|h| h.is_finished()) {
            let _ = handle.join();
        }
    }
}

fn start() -> Session {
    let config = BridgeConfig::default();
    let mut supervisor = ThreadSupervisor { options: config.channel.clone() };
    Session::with_supervisor(&config, &mut supervisor).unwrap()
}

// ============================================================================
//  CALLS
// ============================================================================

#[test]
fn test_by_ref_increment_twice() -> anyhow::Result<()> {
    let mut session = start();
    let mut call = CallDescriptor::new("TestDll", "Increment").arg_ref(1337);

    session.invoke(&mut call)?;
    assert_eq!(call.parameters[0].value, Value::I32(1338));

    session.invoke(&mut call)?;
    assert_eq!(call.parameters[0].value, Value::I32(1339));
    Ok(())
}

#[test]
fn test_pair_keeps_order() {
    let mut session = start();
    let mut call = CallDescriptor::new("TestDll", "IncrementPair").arg_ref(1337).arg_ref(7777);

    session.invoke(&mut call).unwrap();
    assert_eq!(call.parameters[0].value, Value::I32(1338));
    assert_eq!(call.parameters[1].value, Value::I32(7778));
}

#[test]
fn test_strings_under_both_encodings() {
    let mut session = start();
    for (procedure, encoding) in [("Echo", TextEncoding::Ansi), ("EchoWide", TextEncoding::Unicode)] {
        let mut call = CallDescriptor::new("TestDll", procedure)
            .arg("Hello World")
            .returns(TypeDesc::by_value(Kind::Str))
            .with_encoding(encoding);
        let returned = session.invoke(&mut call).unwrap();
        assert_eq!(returned, Some(Value::Str("Hello World".into())), "{}", procedure);
    }
}

#[test]
fn test_unknown_library_and_procedure() {
    let mut session = start();

    let mut call = CallDescriptor::new("NoSuchDll", "Increment").arg_ref(1);
    match session.invoke(&mut call) {
        Err(Error::Remote { kind, .. }) => assert_eq!(kind, ErrorKind::LibraryLoad),
        other => panic!("expected LibraryLoad, got {:?}", other),
    }

    let mut call = CallDescriptor::new("TestDll", "NoSuchProc").arg_ref(1);
    match session.invoke(&mut call) {
        Err(Error::Remote { kind, .. }) => assert_eq!(kind, ErrorKind::ProcedureNotFound),
        other => panic!("expected ProcedureNotFound, got {:?}", other),
    }

    // the session survives both failures
    let mut call = CallDescriptor::new("TestDll", "Increment").arg_ref(1);
    session.invoke(&mut call).unwrap();
    assert_eq!(call.parameters[0].value, Value::I32(2));
}

#[test]
fn test_interface_call_writes_back() {
    let mut session = start();
    let dll = LibraryInterface::new("TestDll")
        .with_convention(archwire::CallingConvention::Cdecl)
        .procedure("Increment", ProcedureSpec::new().arg_ref(Kind::I32))
        .procedure("Bump", ProcedureSpec::new().entry_point("Increment").arg_ref(Kind::I32));

    let mut args = [Value::I32(1337)];
    assert_eq!(session.call(&dll, "Increment", &mut args).unwrap(), None);
    assert_eq!(args[0], Value::I32(1338));

    session.call(&dll, "Bump", &mut args).unwrap();
    assert_eq!(args[0], Value::I32(1339));

    assert!(matches!(session.call(&dll, "Missing", &mut args), Err(Error::UnknownMethod(_))));
    assert!(matches!(session.call(&dll, "Increment", &mut []), Err(Error::ArgumentCount { .. })));
}

// ============================================================================
//  LIFECYCLE
// ============================================================================

#[test]
fn test_close_then_invoke_is_closed_channel() {
    let mut session = start();
    session.close();
    assert!(session.is_closed());
    session.close();

    let mut call = CallDescriptor::new("TestDll", "Increment").arg_ref(1);
    assert!(matches!(session.invoke(&mut call), Err(Error::ClosedChannel)));
}

/// Records whether `stop` ever found the helper still running.
struct WatchedHelper {
    inner: Box<dyn HelperProcess>,
    stopped_while_running: Arc<AtomicBool>,
}

impl HelperProcess for WatchedHelper {
    fn exit_status(&mut self) -> Option<String> {
        self.inner.exit_status()
    }

    fn stop(&mut self) {
        if self.inner.exit_status().is_none() {
            self.stopped_while_running.store(true, Ordering::SeqCst);
        }
        self.inner.stop();
    }
}

struct WatchingSupervisor {
    inner: ThreadSupervisor,
    stopped_while_running: Arc<AtomicBool>,
}

impl Supervisor for WatchingSupervisor {
    fn start(&mut self, token: &ChannelToken) -> archbridge::Result<Box<dyn HelperProcess>> {
        let inner = self.inner.start(token)?;
        Ok(Box::new(WatchedHelper { inner, stopped_while_running: self.stopped_while_running.clone() }))
    }
}

#[test]
fn test_close_lets_helper_exit_on_its_own() {
    let config = BridgeConfig::default();
    let stopped_while_running = Arc::new(AtomicBool::new(false));
    let mut supervisor = WatchingSupervisor {
        inner: ThreadSupervisor { options: config.channel.clone() },
        stopped_while_running: stopped_while_running.clone(),
    };
    let mut session = Session::with_supervisor(&config, &mut supervisor).unwrap();

    let mut call = CallDescriptor::new("TestDll", "Increment").arg_ref(1);
    session.invoke(&mut call).unwrap();
    session.close();

    assert!(!stopped_while_running.load(Ordering::SeqCst));
}

#[test]
fn test_second_client_on_session_token_is_busy() {
    let session = start();
    let result = Channel::connect(session.token(), &ChannelOptions::default());
    assert!(matches!(result, Err(Error::ChannelBusy(_))));
}

#[test]
fn test_launch_failure_propagates() {
    struct NoLaunch;
    impl Supervisor for NoLaunch {
        fn start(&mut self, _token: &ChannelToken) -> archbridge::Result<Box<dyn HelperProcess>> {
            Err(Error::Launch("refused".into()))
        }
    }

    let result = Session::with_supervisor(&BridgeConfig::default(), &mut NoLaunch);
    assert_eq!(result.err(), Some(Error::Launch("refused".into())));
}
