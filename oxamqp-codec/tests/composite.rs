use oxamqp_codec::{from_slice, to_vec, DeserializeComposite, SerializeComposite};

#[derive(Debug, Default, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(
    name = "test:example:list",
    code = 0x0000_0000_0000_0030,
    encoding = "list",
    rename_all = "kebab-case"
)]
struct Example {
    first_field: bool,
    second_field: Option<u32>,
    third_field: Option<String>,
    #[amqp_contract(default)]
    flag: bool,
}

#[derive(Debug, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(name = "test:example:basic", code = 0x0000_0000_0000_0031, encoding = "basic")]
struct Wrapped(u32);

#[derive(Debug, PartialEq, SerializeComposite, DeserializeComposite)]
#[amqp_contract(name = "test:example:empty", code = 0x0000_0000_0000_0032, encoding = "list")]
struct Empty {}

#[test]
fn trailing_nulls_are_omitted() {
    let value = Example {
        first_field: true,
        ..Default::default()
    };
    let buf = to_vec(&value).unwrap();
    assert_eq!(buf, [0x00, 0x53, 0x30, 0xc0, 0x02, 0x01, 0x41]);
    assert_eq!(from_slice::<Example>(&buf).unwrap(), value);
}

#[test]
fn nulls_before_a_set_field_are_written() {
    let value = Example {
        first_field: true,
        second_field: None,
        third_field: Some(String::from("x")),
        flag: false,
    };
    let buf = to_vec(&value).unwrap();
    let expected = [
        0x00, 0x53, 0x30, 0xc0, 0x06, 0x03, 0x41, 0x40, 0xa1, 0x01, 0x78,
    ];
    assert_eq!(buf, expected);
    assert_eq!(from_slice::<Example>(&buf).unwrap(), value);
}

#[test]
fn default_field_is_written_only_when_set() {
    let value = Example {
        first_field: false,
        flag: true,
        ..Default::default()
    };
    let buf = to_vec(&value).unwrap();
    let expected = [
        0x00, 0x53, 0x30, 0xc0, 0x05, 0x04, 0x42, 0x40, 0x40, 0x41,
    ];
    assert_eq!(buf, expected);
    assert_eq!(from_slice::<Example>(&buf).unwrap(), value);
}

#[test]
fn null_default_field_decodes_as_default() {
    let buf = [0x00, 0x53, 0x30, 0xc0, 0x05, 0x04, 0x41, 0x40, 0x40, 0x40];
    let decoded: Example = from_slice(&buf).unwrap();
    assert!(decoded.first_field);
    assert!(!decoded.flag);
}

#[test]
fn missing_mandatory_field_is_an_error() {
    let buf = [0x00, 0x53, 0x30, 0x45];
    assert!(from_slice::<Example>(&buf).is_err());
}

#[test]
fn symbolic_descriptor_is_accepted() {
    let mut buf = vec![0x00, 0xa3, 0x11];
    buf.extend_from_slice(b"test:example:list");
    buf.extend_from_slice(&[0xc0, 0x02, 0x01, 0x42]);
    let decoded: Example = from_slice(&buf).unwrap();
    assert_eq!(decoded, Example::default());
}

#[test]
fn other_descriptor_is_rejected() {
    let buf = [0x00, 0x53, 0x31, 0xc0, 0x02, 0x01, 0x41];
    assert!(from_slice::<Example>(&buf).is_err());
}

#[test]
fn basic_encoding_wraps_the_value() {
    let buf = to_vec(&Wrapped(7)).unwrap();
    assert_eq!(buf, [0x00, 0x53, 0x31, 0x52, 0x07]);
    assert_eq!(from_slice::<Wrapped>(&buf).unwrap(), Wrapped(7));
}

#[test]
fn empty_list_is_list0() {
    let buf = to_vec(&Empty {}).unwrap();
    assert_eq!(buf, [0x00, 0x53, 0x32, 0x45]);
    assert_eq!(from_slice::<Empty>(&buf).unwrap(), Empty {});
}
