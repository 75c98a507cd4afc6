#[allow(dead_code)]
fn add_private_framework_path() {
    // DFRFoundation and SkyLight both live in the system PrivateFrameworks
    // dir.  Prefer the SDK copy when Xcode is installed, since newer systems
    // only ship the frameworks inside the dyld shared cache.
    let sdk_dir = std::process::Command::new("xcode-select")
        .arg("-p")
        .output()
        .ok()
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|dir| dir.trim_end().to_string());

    let mut private_framework_dirs = Vec::new();
    if let Some(dir) = sdk_dir {
        private_framework_dirs.push(
            format!("{}/Platforms/MacOSX.platform/Developer/SDKs/MacOSX.sdk/System/Library/PrivateFrameworks/",
                    dir));
    }
    private_framework_dirs.push(
        "/Library/Developer/CommandLineTools/SDKs/MacOSX.sdk/System/Library/PrivateFrameworks/".into());
    private_framework_dirs.push("/System/Library/PrivateFrameworks/".into());

    match private_framework_dirs.iter().find(|dir| std::path::Path::new(dir).is_dir()) {
        Some(framework_dir) => {
            println!("PrivateFramework dir: {}", framework_dir);
            println!("cargo:rustc-link-search=framework={}", framework_dir);
        }
        None => panic!("PrivateFramework directory not found."),
    }
}

fn main() {
    #[cfg(target_os = "macos")]
    #[cfg(feature = "private_api")]
    add_private_framework_path();
}
