#![expect(unsafe_code, reason = "JNI entry points are exported with #[unsafe(no_mangle)]")]

use crate::{Error, GREETING, init_logging, session};
use jni::JNIEnv;
use jni::objects::{JObject, JString};
use jni::sys::jstring;
use std::{path::Path, ptr};
use tracing::{error, info};

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_test_1monotonic_MainActivity_stringFromJNI<'local>(
    env: JNIEnv<'local>,
    _this: JObject<'local>,
) -> jstring {
    init_logging();

    match env.new_string(GREETING) {
        Ok(greeting) => greeting.into_raw(),
        Err(err) => {
            error!("failed to create the greeting string: {err}");
            ptr::null_mut()
        }
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_test_1monotonic_MainActivity_startTester<'local>(
    mut env: JNIEnv<'local>,
    _this: JObject<'local>,
    folder: JString<'local>,
) {
    init_logging();

    let started = log_folder(&mut env, &folder)
        .and_then(|folder| session::start(Path::new(&folder)));

    match started {
        Ok(path) => info!("startTester: logging to {}", path.display()),
        Err(err) => error!("startTester failed: {err}"),
    }
}

#[unsafe(no_mangle)]
pub extern "system" fn Java_com_example_test_1monotonic_MainActivity_stopTester<'local>(
    _env: JNIEnv<'local>,
    _this: JObject<'local>,
) {
    init_logging();

    match session::stop() {
        Ok(Some(stats)) => info!("stopTester: {stats}"),
        Ok(None) => info!("stopTester: no tester running"),
        Err(err) => error!("stopTester failed: {err}"),
    }
}

fn log_folder(env: &mut JNIEnv<'_>, folder: &JString<'_>) -> Result<String, Error> {
    Ok(env.get_string(folder)?.into())
}
