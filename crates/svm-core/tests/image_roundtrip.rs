use svm_core::{assemble_source, ChunkLoader, ChunkWriter, VirtualMachine, VmConfig};

const COUNTDOWN: &str = r#"
        push 3
        store 0
        pop
loop:   load 0
        jmp_if_false done
        print
        load 0
        push 1
        sub
        store 0
        pop
        jmp loop
done:   push "liftoff"
        print
        halt
"#;

fn run_output(chunk: &svm_core::Chunk) -> String {
    let mut vm = VirtualMachine::with_output(VmConfig::new(), Vec::new());
    assert!(vm.execute(chunk), "run faulted: {:?}", vm.fault());
    String::from_utf8(vm.into_output()).expect("output is not utf-8")
}

#[test]
fn assembled_source_runs_the_same_from_an_image() {
    let chunk = assemble_source(COUNTDOWN).expect("assemble failed");
    let image = ChunkWriter::write(&chunk);

    assert!(ChunkLoader::is_image(&image));
    assert!(!ChunkLoader::is_image(COUNTDOWN.as_bytes()));

    let loaded = ChunkLoader::load(&image).expect("load failed");
    assert_eq!(loaded.lines(), chunk.lines());

    let expected = "3\n2\n1\nliftoff\n";
    assert_eq!(run_output(&chunk), expected);
    assert_eq!(run_output(&loaded), expected);
}

#[test]
fn truncated_image_is_rejected() {
    let chunk = assemble_source(COUNTDOWN).expect("assemble failed");
    let image = ChunkWriter::write(&chunk);

    assert!(ChunkLoader::load(&image[..image.len() - 3]).is_err());
}
