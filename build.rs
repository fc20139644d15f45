use std::env;

fn main() {
    // The FTDI backend links against libMPSSE, which is not checked in.
    // Point LIBMPSSE_LIB_DIR at the extracted FTDI package.
    if env::var_os("CARGO_FEATURE_FTDI").is_some() {
        if let Ok(lib_dir) = env::var("LIBMPSSE_LIB_DIR") {
            println!("cargo:rustc-link-search=native={}", lib_dir);
        }

        // libmpsse depends on FTD2XX, which is loaded at runtime
        println!("cargo:rustc-link-lib=dylib=libmpsse");
    }

    println!("cargo:rerun-if-env-changed=LIBMPSSE_LIB_DIR");
}
