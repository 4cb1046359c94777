use std::process::Command;

fn main() {
    let git_hash = match Command::new("git").args(["rev-parse", "--short", "HEAD"]).output(){
        Ok(output) if output.status.success() => {
            match String::from_utf8(output.stdout){
                Ok(hash) => hash.trim().to_owned(),
                Err(_) => "GitHash:PARSE_ERROR".to_owned()
            }
        },
        // not inside a repository, e.g. when building from a source tarball
        Ok(_) => "GitHash:NO_REPOSITORY".to_owned(),
        Err(_) => "GitHash:ERROR_git_not_installed?".to_owned()
    };
    println!("cargo:rustc-env=GIT_HASH={git_hash}");
    println!("cargo:rustc-env=BUILD_TIME_CHRONO={}", chrono::offset::Local::now());
    println!("cargo:rerun-if-changed=.git/HEAD");
}
